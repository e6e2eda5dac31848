pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod google;
pub mod media;
pub mod memory;
pub mod package_repo;
pub mod user_repo;

pub use app_config::Config;
pub use booking_repo::StoreBookingRepository;
pub use database::DbClient;
pub use google::HttpGoogleVerifier;
pub use media::{MediaError, MediaKind, MediaStore};
pub use memory::MemoryStore;
pub use package_repo::StorePackageRepository;
pub use user_repo::StoreUserRepository;
