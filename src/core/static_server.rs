use mime_guess::from_path;
use rust_embed::RustEmbed;
use spin_sdk::http::Response;

use crate::core::errors::AppError;

#[derive(RustEmbed)]
#[folder = "static"]
struct Assets;

/// Serve an embedded asset (stylesheet, favicon). Pages are rendered by
/// `templates`, not here.
pub fn serve_static(path: &str) -> anyhow::Result<Response> {
    let file_path = path.trim_start_matches('/');

    let Some(file) = Assets::get(file_path) else {
        return Ok(AppError::NotFound.into());
    };

    let mime = from_path(file_path).first_or_octet_stream();

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", mime.as_ref())
        .body(file.data.to_vec())
        .build())
}
