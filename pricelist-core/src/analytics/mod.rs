//! Analytics over the merged dataset: returns, aggregates, correlation.
//!
//! Everything here is a pure function of a [`LongitudinalDataset`]. Missing
//! values are never treated as zero and never forward-filled.

pub mod aggregate;
pub mod correlation;
pub mod returns;

pub use aggregate::{
    bottom_by_volume, company_aggregates, date_aggregates, top_by_volume, CompanyAggregate,
    DateAggregate,
};
pub use correlation::{pearson, CorrelationMatrix};
pub use returns::{compute_returns, pct_change, ReturnPoint};

use crate::data::LongitudinalDataset;
use serde::{Deserialize, Serialize};

/// Default length of the most/least traded lists.
pub const DEFAULT_RANKING_SIZE: usize = 5;

/// Everything derived from one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsResult {
    /// One point per dataset row, in dataset order.
    pub returns: Vec<ReturnPoint>,
    pub daily: Vec<DateAggregate>,
    pub companies: Vec<CompanyAggregate>,
    pub correlation: CorrelationMatrix,
    /// Correlation between each company's total volume and average close.
    pub volume_close_correlation: Option<f64>,
    /// Symbols ranked by total volume, most traded first.
    pub most_traded: Vec<String>,
    /// Symbols ranked by total volume, least traded first.
    pub least_traded: Vec<String>,
}

impl AnalyticsResult {
    pub fn company(&self, symbol: &str) -> Option<&CompanyAggregate> {
        self.companies.iter().find(|c| c.symbol == symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsEngine {
    pub ranking_size: usize,
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self {
            ranking_size: DEFAULT_RANKING_SIZE,
        }
    }
}

impl AnalyticsEngine {
    pub fn new(ranking_size: usize) -> Self {
        Self { ranking_size }
    }

    pub fn compute(&self, dataset: &LongitudinalDataset) -> AnalyticsResult {
        let returns = compute_returns(dataset);
        let daily = date_aggregates(dataset);
        let companies = company_aggregates(dataset);
        let correlation = CorrelationMatrix::compute(dataset);

        let volumes: Vec<Option<f64>> = companies.iter().map(|c| c.total_volume).collect();
        let closes: Vec<Option<f64>> = companies.iter().map(|c| c.average_close).collect();
        let volume_close_correlation = pearson(&volumes, &closes);

        let symbols = |ranked: Vec<&CompanyAggregate>| -> Vec<String> {
            ranked.into_iter().map(|c| c.symbol.clone()).collect()
        };
        let most_traded = symbols(top_by_volume(&companies, self.ranking_size));
        let least_traded = symbols(bottom_by_volume(&companies, self.ranking_size));

        tracing::debug!(
            rows = dataset.len(),
            dates = daily.len(),
            companies = companies.len(),
            "analytics computed"
        );

        AnalyticsResult {
            returns,
            daily,
            companies,
            correlation,
            volume_close_correlation,
            most_traded,
            least_traded,
        }
    }
}
