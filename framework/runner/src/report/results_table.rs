use tabled::Tabled;

use crate::evaluate::{ElementResult, Status};

#[derive(Tabled)]
pub struct ResultRow {
    pub name: String,
    pub status: Status,
    #[tabled(display = "float2")]
    pub threshold_ms: f64,
    #[tabled(display = "float2")]
    pub actual_ms: f64,
}

impl From<&ElementResult> for ResultRow {
    fn from(result: &ElementResult) -> Self {
        Self {
            name: result.name.clone(),
            status: result.status,
            threshold_ms: result.threshold,
            actual_ms: result.actual,
        }
    }
}

#[derive(Tabled)]
pub struct SkippedRow {
    pub name: String,
    pub reason: String,
}

fn float2(n: &f64) -> String {
    format!("{:.2}", n)
}
