pub mod csv_export;
pub mod input;
pub mod results;

pub use csv_export::write_reports;
pub use input::load_ips;
pub use results::ResultsFile;
