// Website endpoints
//
// `/api/webserver/websites`. The list view only carries name, id and
// status unless `fields=*` is requested.

use tracing::debug;

use crate::client::{IisClient, escape};
use crate::error::Error;
use crate::reconcile::{ResourceKind, create_or_adopt, find_by_key};
use crate::resources::models::{CreateWebsiteRequest, UpdateWebsiteRequest, Website, WebsiteList};

const WEBSITES: &str = "/api/webserver/websites";

impl IisClient {
    /// Create a website, adopting an existing one with the same name.
    ///
    /// `POST /api/webserver/websites`
    pub async fn create_website(&self, request: &CreateWebsiteRequest) -> Result<Website, Error> {
        debug!(name = %request.name, "creating website");
        create_or_adopt(
            ResourceKind::Website,
            &request.name,
            || self.post_json(WEBSITES, request),
            || self.list_websites(),
        )
        .await
    }

    /// `GET /api/webserver/websites?fields=*`
    pub async fn list_websites(&self) -> Result<Vec<Website>, Error> {
        let list: WebsiteList = self.get_json(&format!("{WEBSITES}?fields=*")).await?;
        Ok(list.websites)
    }

    /// `GET /api/webserver/websites/{id}`
    pub async fn get_website(&self, id: &str) -> Result<Website, Error> {
        self.get_json(&format!("{WEBSITES}/{}", escape(id))).await
    }

    pub async fn find_website_by_name(&self, name: &str) -> Result<Website, Error> {
        let sites = self.list_websites().await?;
        find_by_key(ResourceKind::Website, sites, name).ok_or_else(|| Error::NotFound {
            kind: ResourceKind::Website,
            key: name.to_owned(),
        })
    }

    /// `PATCH /api/webserver/websites/{id}`
    pub async fn update_website(
        &self,
        id: &str,
        update: &UpdateWebsiteRequest,
    ) -> Result<Website, Error> {
        debug!(id, "updating website");
        self.patch_json(&format!("{WEBSITES}/{}", escape(id)), update)
            .await
    }

    /// `DELETE /api/webserver/websites/{id}`
    pub async fn delete_website(&self, id: &str) -> Result<(), Error> {
        debug!(id, "deleting website");
        self.delete(&format!("{WEBSITES}/{}", escape(id))).await
    }
}
