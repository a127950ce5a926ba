pub mod id;
pub mod movie;
pub mod pagination;
pub mod vendor;

pub use id::{generate_id, MovieId, RoomId, UserId};
pub use movie::{split_alist_path, BilibiliRef, Movie, MovieBase, MoviePatch, VendorInfo, VendorKind};
pub use pagination::{page_window, Page};
pub use vendor::{alist_server_id, AlistVendor, BilibiliVendor};
