pub mod thermal_impl;
pub mod thermal_logic;
