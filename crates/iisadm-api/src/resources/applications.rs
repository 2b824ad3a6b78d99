// Web application endpoints

use tracing::debug;

use crate::client::{IisClient, escape};
use crate::error::Error;
use crate::resources::models::{Application, UpdateApplicationRequest};

const WEBAPPS: &str = "/api/webserver/webapps";

impl IisClient {
    /// `GET /api/webserver/webapps/{id}`
    pub async fn get_application(&self, id: &str) -> Result<Application, Error> {
        self.get_json(&format!("{WEBAPPS}/{}", escape(id))).await
    }

    /// `PATCH /api/webserver/webapps/{id}`
    pub async fn update_application(
        &self,
        id: &str,
        update: &UpdateApplicationRequest,
    ) -> Result<Application, Error> {
        debug!(id, "updating application");
        self.patch_json(&format!("{WEBAPPS}/{}", escape(id)), update)
            .await
    }
}
