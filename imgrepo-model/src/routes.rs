macro_rules! v1_path {
    ($path:literal) => {
        concat!("/api/v1", $path)
    };
}

pub const HEALTH: &str = "/health";

/// Versioned API route definitions shared by the server and the client.
pub mod v1 {
    pub const ROOT: &str = "/api/v1";

    pub mod auth {
        pub const REGISTER: &str = v1_path!("/auth/register");
        pub const LOGIN: &str = v1_path!("/auth/login");
    }

    pub mod images {
        use crate::ids::ImageID;

        pub const COLLECTION: &str = v1_path!("/images");
        pub const ITEM: &str = v1_path!("/images/{id}");

        pub fn item(id: ImageID) -> String {
            ITEM.replace("{id}", &id.to_string())
        }
    }
}
