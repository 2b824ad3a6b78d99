// Typed resource endpoints
//
// Inherent methods on `IisClient`, one file per collection. Every create
// goes through `reconcile::create_or_adopt`.

pub mod app_pools;
pub mod applications;
pub mod certificates;
pub mod files;
pub mod models;
pub mod websites;

pub use models::{
    Application, ApplicationPool, Binding, Certificate, CopyMoveRequest, CreateAppPoolRequest,
    CreateFileRequest, CreateWebsiteRequest, File, FileRef, FileType, Reference,
    UpdateAppPoolRequest, UpdateApplicationRequest, UpdateWebsiteRequest, Website,
};
