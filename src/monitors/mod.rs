pub mod cpu_usage;
