//! loadfeed: republish Open Power System Data load figures as line protocol.
//!
//! The dataset is one CSV with a `utc_timestamp` column followed by
//! `"{COUNTRY}_{metric}"` columns. [`process::build_records`] turns it into
//! per-country [`Record`]s after a cutoff date, [`line_protocol::encode`]
//! renders each one, and [`publish::publish_all`] sends them to an MQTT topic.

pub mod config;
pub mod error;
pub mod fetch;
pub mod line_protocol;
pub mod process;
pub mod publish;

pub use config::{Config, Grouping};
pub use error::{Error, Result};
pub use process::Record;
