//! Business logic services

pub mod authors;
pub mod catalog;
pub mod email;
pub mod kpi;
pub mod loans;
pub mod members;
pub mod publication;
pub mod subscriptions;
pub mod uploads;

use std::sync::Arc;

use crate::{config::UploadsConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub authors: authors::AuthorsService,
    pub members: members::MembersService,
    pub loans: loans::LoansService,
    pub subscriptions: subscriptions::SubscriptionsService,
    pub publication: publication::PublicationService,
    pub kpi: kpi::KpiService,
    pub uploads: uploads::UploadService,
    pub repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, mailer: Arc<dyn email::Mailer>, uploads: UploadsConfig) -> Self {
        let uploads = uploads::UploadService::new(uploads);
        Self {
            catalog: catalog::CatalogService::new(repository.clone(), uploads.clone()),
            authors: authors::AuthorsService::new(repository.clone(), uploads.clone()),
            members: members::MembersService::new(repository.clone()),
            loans: loans::LoansService::new(repository.clone()),
            subscriptions: subscriptions::SubscriptionsService::new(repository.clone()),
            publication: publication::PublicationService::new(repository.clone(), mailer),
            kpi: kpi::KpiService::new(repository.clone()),
            uploads,
            repository,
        }
    }
}
