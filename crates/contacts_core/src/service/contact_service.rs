//! Contact use-case service.
//!
//! # Responsibility
//! - Provide CRUD and paginated search entry points for core callers.
//! - Translate repository misses into `NotFound` for active contacts.
//!
//! # Invariants
//! - Deleted contacts behave as missing for every operation here.
//! - Default listing order is last name ascending.

use crate::model::contact::{Contact, ContactId};
use crate::repo::contact_repo::{ContactListQuery, ContactRepository, ContactSort, RepoError};
use log::info;
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

pub type ContactServiceResult<T> = Result<T, ContactServiceError>;

#[derive(Debug, Error)]
pub enum ContactServiceError {
    #[error("contact not found: {0}")]
    NotFound(ContactId),
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for ContactServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Zero-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    /// Clamped to `1..=MAX_PAGE_SIZE`.
    pub size: u32,
    pub sort: ContactSort,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size,
            sort: ContactSort::LastNameAsc,
        }
    }

    pub fn with_sort(mut self, sort: ContactSort) -> Self {
        self.sort = sort;
        self
    }

    fn effective_size(&self) -> u32 {
        self.size.clamp(1, MAX_PAGE_SIZE)
    }

    fn offset(&self) -> u32 {
        self.page.saturating_mul(self.effective_size())
    }
}

/// One page of active contacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactPage {
    pub items: Vec<Contact>,
    pub page: u32,
    pub size: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

/// Use-case service wrapper for contact CRUD operations.
pub struct ContactService<R: ContactRepository> {
    repo: R,
}

impl<R: ContactRepository> ContactService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists active contacts matching `search` (first name, last name or email).
    pub fn find_page(
        &self,
        search: Option<&str>,
        request: PageRequest,
    ) -> ContactServiceResult<ContactPage> {
        let size = request.effective_size();
        let query = ContactListQuery {
            search: search.map(str::to_string),
            include_deleted: false,
            sort: request.sort,
            limit: Some(size),
            offset: request.offset(),
        };

        let total_items = self.repo.count_contacts(&query)?;
        let items = self.repo.list_contacts(&query)?;

        Ok(ContactPage {
            items,
            page: request.page,
            size,
            total_items,
            total_pages: total_items.div_ceil(u64::from(size)),
        })
    }

    pub fn find_by_id(&self, id: ContactId) -> ContactServiceResult<Contact> {
        self.repo
            .get_contact(id, false)?
            .ok_or(ContactServiceError::NotFound(id))
    }

    /// Persists a new contact and returns it as stored.
    pub fn create_contact(&self, contact: &Contact) -> ContactServiceResult<Contact> {
        let mut draft = contact.clone();
        draft.id = None;
        draft.is_deleted = false;

        let id = self.repo.create_contact(&draft)?;
        info!("event=contact_create module=service status=ok contact_id={id}");
        self.find_by_id(id)
    }

    /// Replaces the editable fields of an active contact.
    pub fn update_contact(
        &self,
        id: ContactId,
        changes: &Contact,
    ) -> ContactServiceResult<Contact> {
        let mut stored = self.find_by_id(id)?;
        stored.apply_changes(changes);
        self.repo.update_contact(&stored)?;
        info!("event=contact_update module=service status=ok contact_id={id}");
        self.find_by_id(id)
    }

    /// Soft-deletes an active contact.
    pub fn delete_contact(&self, id: ContactId) -> ContactServiceResult<()> {
        self.repo.soft_delete_contact(id)?;
        info!("event=contact_delete module=service status=ok contact_id={id}");
        Ok(())
    }
}
