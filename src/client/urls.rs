// src/client/urls.rs
//! Paths of the cluster API, relative to a cluster's base URL.

const API_URL: &str = "/apis/v2";

pub fn members() -> String {
    format!("{}/status/members", API_URL)
}

pub fn objects() -> String {
    format!("{}/objects", API_URL)
}

pub fn status_objects() -> String {
    format!("{}/status/objects", API_URL)
}

pub fn logs() -> String {
    format!("{}/logs", API_URL)
}
