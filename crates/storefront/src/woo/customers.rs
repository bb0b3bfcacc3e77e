//! Customer endpoints.

use tracing::instrument;

use marketstall_core::{CustomerId, Email};

use super::CommerceError;
use super::client::CommerceClient;
use super::types::{Customer, NewCustomer};

impl CommerceClient {
    /// Get a customer by id.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::NotFound`] if the customer does not exist.
    #[instrument(skip(self), fields(customer_id = %id))]
    pub async fn get_customer(&self, id: CustomerId) -> Result<Customer, CommerceError> {
        self.get(&format!("customers/{id}"), &[]).await
    }

    /// Look up a customer by email address.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, email))]
    pub async fn find_customer_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<Customer>, CommerceError> {
        let query = [
            ("email", email.as_str().to_string()),
            ("role", "all".to_string()),
        ];
        let customers: Vec<Customer> = self.get("customers", &query).await?;
        Ok(customers.into_iter().next())
    }

    /// Create a customer account.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::Api`] with code
    /// `registration-error-email-exists` when the email is taken.
    #[instrument(skip(self, customer))]
    pub async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer, CommerceError> {
        self.post("customers", customer).await
    }
}
