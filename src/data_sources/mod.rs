pub mod cities;
pub mod geocoding;
pub mod http;
pub mod weather_data;

pub use cities::{read_cities, City};
pub use geocoding::CoordinateResolver;
pub use http::{HttpGet, HttpJson, ReqwestHttp};
pub use weather_data::{HistoricalWeatherFetcher, Observation};
