// Certificate endpoints

use crate::client::IisClient;
use crate::error::Error;
use crate::resources::models::{Certificate, CertificateList};

impl IisClient {
    /// `GET /api/certificates`
    pub async fn list_certificates(&self) -> Result<Vec<Certificate>, Error> {
        let list: CertificateList = self.get_json("/api/certificates").await?;
        Ok(list.certificates)
    }
}
