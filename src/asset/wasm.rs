use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};

use super::{AssetFetcher, LoadCompletion, LoadError};

/// Fetches models over HTTP with `window.fetch`.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher;

impl AssetFetcher for HttpFetcher {
    fn fetch(&self, url: &str, completion: LoadCompletion) {
        let url = url.to_string();
        spawn_local(async move {
            if !completion.is_current() {
                return;
            }
            let bytes = fetch_bytes(&url).await.map_err(|reason| LoadError::Fetch {
                url: url.clone(),
                reason,
            });
            completion.settle(bytes);
        });
    }
}

async fn fetch_bytes(url: &str) -> Result<Vec<u8>, String> {
    let window = web_sys::window().ok_or_else(|| "window not available".to_string())?;
    let response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(describe)?;
    let response: web_sys::Response = response
        .dyn_into()
        .map_err(|_| "fetch did not return a Response".to_string())?;
    if !response.ok() {
        return Err(format!("HTTP {} {}", response.status(), response.status_text()));
    }
    let buffer = JsFuture::from(response.array_buffer().map_err(describe)?)
        .await
        .map_err(describe)?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

fn describe(err: JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}
