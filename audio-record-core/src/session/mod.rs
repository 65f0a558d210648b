mod capture;
pub mod manager;
