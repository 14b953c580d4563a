pub mod routes;

use serde::Deserialize;

use crate::evaluation::FlagType;

#[derive(Debug, Deserialize)]
pub struct ListFlagsQuery {
    #[serde(rename = "type")]
    pub flag_type: Option<FlagType>,
}
