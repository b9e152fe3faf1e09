//! Saving split recipients as contacts.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use splitter_types::RecipientAddress;

use crate::error::SplitError;

/// Where recipients of settled splits are remembered.
pub trait ContactBook: Send + Sync {
    /// Merge `recipients` into the book. Already known addresses are skipped.
    fn save(&self, recipients: &[RecipientAddress]) -> Result<(), SplitError>;

    fn load(&self) -> Result<Vec<RecipientAddress>, SplitError>;
}

impl<T: ContactBook + ?Sized> ContactBook for Arc<T> {
    fn save(&self, recipients: &[RecipientAddress]) -> Result<(), SplitError> {
        (**self).save(recipients)
    }

    fn load(&self) -> Result<Vec<RecipientAddress>, SplitError> {
        (**self).load()
    }
}

/// Remembers nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoContacts;

impl ContactBook for NoContacts {
    fn save(&self, _recipients: &[RecipientAddress]) -> Result<(), SplitError> {
        Ok(())
    }

    fn load(&self) -> Result<Vec<RecipientAddress>, SplitError> {
        Ok(Vec::new())
    }
}

/// Contacts kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryContacts {
    contacts: Mutex<Vec<RecipientAddress>>,
}

impl MemoryContacts {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContactBook for MemoryContacts {
    fn save(&self, recipients: &[RecipientAddress]) -> Result<(), SplitError> {
        let mut contacts = self.contacts.lock().unwrap_or_else(PoisonError::into_inner);
        merge_into(&mut contacts, recipients);
        Ok(())
    }

    fn load(&self) -> Result<Vec<RecipientAddress>, SplitError> {
        Ok(self
            .contacts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

/// Contacts stored as a JSON array of addresses.
///
/// A missing file is an empty book. Saving rewrites the whole file.
#[derive(Clone, Debug)]
pub struct JsonContacts {
    path: PathBuf,
}

impl JsonContacts {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ContactBook for JsonContacts {
    fn save(&self, recipients: &[RecipientAddress]) -> Result<(), SplitError> {
        let mut contacts = self.load()?;
        let before = contacts.len();
        merge_into(&mut contacts, recipients);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| contacts_error(&self.path, e))?;
        }
        let json = serde_json::to_string_pretty(&contacts)
            .map_err(|e| SplitError::Contacts(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| contacts_error(&self.path, e))?;

        tracing::debug!(
            path = %self.path.display(),
            added = contacts.len() - before,
            total = contacts.len(),
            "contacts saved"
        );
        Ok(())
    }

    fn load(&self) -> Result<Vec<RecipientAddress>, SplitError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(contacts_error(&self.path, e)),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content)
            .map_err(|e| SplitError::Contacts(format!("{}: {e}", self.path.display())))
    }
}

fn merge_into(contacts: &mut Vec<RecipientAddress>, recipients: &[RecipientAddress]) {
    for recipient in recipients {
        if !contacts.contains(recipient) {
            contacts.push(*recipient);
        }
    }
}

fn contacts_error(path: &Path, e: std::io::Error) -> SplitError {
    SplitError::Contacts(format!("{}: {e}", path.display()))
}
