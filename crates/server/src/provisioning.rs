//! Student account provisioning.
//!
//! Account creation and deletion in the institutional directory sit behind
//! [`AccountProvisioner`]. The shipped [`LoggingProvisioner`] records the
//! request and reports success; the seat counter is only touched after the
//! provisioner returns.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Provisioning failures.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("directory rejected the request: {0}")]
    Rejected(String),

    #[error("directory unavailable: {0}")]
    Unavailable(String),

    #[error("already exists: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),
}

/// A directory account as reported by the provisioner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Account {
    pub email: String,
}

/// Details of a new student account.
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub email: String,
    pub full_name: String,
    pub semester: String,
    pub program: String,
    pub password: String,
    pub personal_email: String,
}

/// Directory operations needed by registration and account deletion.
#[async_trait]
pub trait AccountProvisioner: Send + Sync {
    /// Look up an existing account by student email.
    async fn find_account(&self, email: &str) -> Result<Option<Account>, ProvisioningError>;

    /// Create the account.
    async fn create_account(&self, account: &NewAccount) -> Result<Account, ProvisioningError>;

    /// Delete the account.
    async fn delete_account(&self, email: &str) -> Result<(), ProvisioningError>;

    /// Attach `alias` to the mailbox `primary`.
    async fn add_alias(&self, primary: &str, alias: &str) -> Result<(), ProvisioningError>;

    /// Detach `alias` from the mailbox `primary`.
    async fn delete_alias(&self, primary: &str, alias: &str) -> Result<(), ProvisioningError>;
}

/// Provisioner that only logs. No directory is contacted.
#[derive(Clone, Debug, Default)]
pub struct LoggingProvisioner;

#[async_trait]
impl AccountProvisioner for LoggingProvisioner {
    async fn find_account(&self, _email: &str) -> Result<Option<Account>, ProvisioningError> {
        Ok(None)
    }

    async fn create_account(&self, account: &NewAccount) -> Result<Account, ProvisioningError> {
        tracing::info!(
            email = %account.email,
            full_name = %account.full_name,
            semester = %account.semester,
            program = %account.program,
            "Creating student account"
        );
        Ok(Account {
            email: account.email.clone(),
        })
    }

    async fn delete_account(&self, email: &str) -> Result<(), ProvisioningError> {
        tracing::info!(email, "Deleting student account");
        Ok(())
    }

    async fn add_alias(&self, primary: &str, alias: &str) -> Result<(), ProvisioningError> {
        tracing::info!(primary, alias, "Adding mailbox alias");
        Ok(())
    }

    async fn delete_alias(&self, primary: &str, alias: &str) -> Result<(), ProvisioningError> {
        tracing::info!(primary, alias, "Deleting mailbox alias");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn logging_provisioner_always_succeeds() {
        let provisioner = LoggingProvisioner;
        assert!(
            provisioner
                .find_account("alice@students.test.edu")
                .await
                .unwrap()
                .is_none()
        );

        let account = provisioner
            .create_account(&NewAccount {
                email: "alice@students.test.edu".to_string(),
                full_name: "Alice Liddell".to_string(),
                semester: "2026 Fall".to_string(),
                program: "Mathematics".to_string(),
                password: "hunter22".to_string(),
                personal_email: "alice@example.com".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(account.email, "alice@students.test.edu");

        provisioner
            .add_alias("alice@students.test.edu", "kst_alice@students.test.edu")
            .await
            .unwrap();
        provisioner
            .delete_alias("alice@students.test.edu", "kst_alice@students.test.edu")
            .await
            .unwrap();

        provisioner
            .delete_account("alice@students.test.edu")
            .await
            .unwrap();
    }
}
