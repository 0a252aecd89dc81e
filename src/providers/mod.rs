pub mod amfi;
pub mod mfapi;
pub mod nse;
pub mod sheets;
pub mod yahoo;
