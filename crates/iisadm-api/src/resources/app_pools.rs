// Application pool endpoints
//
// `/api/webserver/application-pools`, listed under the `app_pools` key.

use tracing::debug;

use crate::client::{IisClient, escape};
use crate::error::Error;
use crate::reconcile::{ResourceKind, create_or_adopt, find_by_key};
use crate::resources::models::{
    AppPoolList, ApplicationPool, CreateAppPoolRequest, UpdateAppPoolRequest,
};

const APP_POOLS: &str = "/api/webserver/application-pools";

impl IisClient {
    /// Create an application pool, adopting an existing one with the same name.
    ///
    /// `POST /api/webserver/application-pools`
    pub async fn create_app_pool(
        &self,
        name: &str,
        managed_runtime_version: Option<&str>,
    ) -> Result<ApplicationPool, Error> {
        let body = CreateAppPoolRequest {
            name: name.to_owned(),
            managed_runtime_version: managed_runtime_version.map(str::to_owned),
        };
        debug!(name, "creating application pool");
        create_or_adopt(
            ResourceKind::AppPool,
            name,
            || self.post_json(APP_POOLS, &body),
            || self.list_app_pools(),
        )
        .await
    }

    /// `GET /api/webserver/application-pools`
    pub async fn list_app_pools(&self) -> Result<Vec<ApplicationPool>, Error> {
        let list: AppPoolList = self.get_json(APP_POOLS).await?;
        Ok(list.app_pools)
    }

    /// `GET /api/webserver/application-pools/{id}`
    pub async fn get_app_pool(&self, id: &str) -> Result<ApplicationPool, Error> {
        self.get_json(&format!("{APP_POOLS}/{}", escape(id))).await
    }

    /// Look a pool up by exact name.
    pub async fn find_app_pool_by_name(&self, name: &str) -> Result<ApplicationPool, Error> {
        let pools = self.list_app_pools().await?;
        find_by_key(ResourceKind::AppPool, pools, name).ok_or_else(|| Error::NotFound {
            kind: ResourceKind::AppPool,
            key: name.to_owned(),
        })
    }

    /// `PATCH /api/webserver/application-pools/{id}`
    pub async fn update_app_pool(
        &self,
        id: &str,
        update: &UpdateAppPoolRequest,
    ) -> Result<ApplicationPool, Error> {
        debug!(id, "updating application pool");
        self.patch_json(&format!("{APP_POOLS}/{}", escape(id)), update)
            .await
    }

    /// `DELETE /api/webserver/application-pools/{id}`
    pub async fn delete_app_pool(&self, id: &str) -> Result<(), Error> {
        debug!(id, "deleting application pool");
        self.delete(&format!("{APP_POOLS}/{}", escape(id))).await
    }
}
