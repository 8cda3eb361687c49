//! Library-wide indicators

use crate::{error::AppResult, models::kpi::Kpis, repository::Repository};

#[derive(Clone)]
pub struct KpiService {
    repository: Repository,
}

impl KpiService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn compute_kpis(&self) -> AppResult<Kpis> {
        let total = self.repository.books.count(None).await?;
        let published = self.repository.books.count(Some(true)).await?;
        let rates = self.repository.members.return_rates().await?;

        Ok(Kpis::compute(total, published, &rates))
    }
}
