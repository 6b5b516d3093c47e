//! Model file selection and URL fetching for WASM
//!
//! File contents arrive in JavaScript callbacks and are pushed onto the
//! shared [`ModelUploads`] queue, which the scene drains each frame.

use bevy::prelude::*;
use orbitview_core::ModelFormat;
use orbitview_scene::{FileDialogRequest, ModelFile, ModelUploads, ViewerSettings};

/// Plugin for the file dialog and startup model URL
pub struct FilePickerPlugin;

impl Plugin for FilePickerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, fetch_startup_model)
            .add_systems(Update, open_requested_dialog);
    }
}

/// Open the browser file dialog when the panel asks for it
fn open_requested_dialog(mut request: ResMut<FileDialogRequest>, uploads: Res<ModelUploads>) {
    if !request.0 {
        return;
    }
    request.0 = false;
    tracing::info!("Opening file picker dialog");
    open_file_picker(ModelFormat::ACCEPT, uploads.clone());
}

/// Fetch the model named by `?model=` on startup
fn fetch_startup_model(settings: Res<ViewerSettings>, uploads: Res<ModelUploads>) {
    if let Some(url) = &settings.0.model_url {
        tracing::info!("Loading model from URL parameter: {}", url);
        fetch_model(url.clone(), uploads.clone());
    }
}

/// Last path segment of a URL, without query or fragment
pub fn file_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or("model")
        .to_string()
}

// ============================================================================
// JavaScript Interop (WASM only)
// ============================================================================

#[cfg(target_arch = "wasm32")]
mod js_interop {
    use super::*;
    use orbitview_core::ViewerConfig;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use web_sys::{FileReader, HtmlInputElement};

    /// Decoded values of the recognized page URL query parameters
    pub fn location_query_pairs() -> Vec<(&'static str, String)> {
        let Some(href) = web_sys::window().and_then(|w| w.location().href().ok()) else {
            return Vec::new();
        };
        let Ok(url) = web_sys::Url::new(&href) else {
            return Vec::new();
        };
        let params = url.search_params();
        ViewerConfig::QUERY_KEYS
            .into_iter()
            .filter_map(|key| params.get(key).map(|value| (key, value)))
            .collect()
    }

    /// Open a file dialog using a hidden input element
    pub fn open_file_picker(accept: &str, uploads: ModelUploads) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            tracing::error!("open_file_picker: no document");
            return;
        };

        let input: HtmlInputElement = match document
            .create_element("input")
            .map(|el| el.dyn_into::<HtmlInputElement>())
        {
            Ok(Ok(input)) => input,
            _ => {
                tracing::error!("open_file_picker: failed to create input element");
                return;
            }
        };

        input.set_type("file");
        input.set_accept(accept);
        input.style().set_property("display", "none").ok();

        // Must be in the DOM for click() to work in some browsers
        let Some(body) = document.body() else {
            tracing::error!("open_file_picker: no document body");
            return;
        };
        if let Err(e) = body.append_child(&input) {
            tracing::error!("open_file_picker: failed to append input: {:?}", e);
            return;
        }

        let input_clone = input.clone();
        let closure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            if let Some(file) = input_clone.files().and_then(|files| files.get(0)) {
                read_file(file, uploads.clone());
            } else {
                tracing::info!("No file selected");
            }

            if let Some(parent) = input_clone.parent_node() {
                parent.remove_child(&input_clone).ok();
            }
        }) as Box<dyn FnMut(_)>);

        input.set_onchange(Some(closure.as_ref().unchecked_ref()));
        closure.forget();

        input.click();
    }

    fn read_file(file: web_sys::File, uploads: ModelUploads) {
        let name = file.name();
        tracing::info!("File selected: {}", name);

        let reader = match FileReader::new() {
            Ok(r) => r,
            Err(e) => {
                uploads.push(Err(format!("Failed to create FileReader: {:?}", e)));
                return;
            }
        };

        let reader_clone = reader.clone();
        let onload = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            let upload = reader_clone
                .result()
                .map_err(|e| format!("Read error: {:?}", e))
                .and_then(|result| {
                    result
                        .dyn_into::<js_sys::ArrayBuffer>()
                        .map_err(|_| "Read result is not an ArrayBuffer".to_string())
                })
                .map(|buffer| ModelFile {
                    name: name.clone(),
                    bytes: js_sys::Uint8Array::new(&buffer).to_vec(),
                });
            uploads.push(upload);
        }) as Box<dyn FnMut(_)>);

        reader.set_onload(Some(onload.as_ref().unchecked_ref()));
        onload.forget();

        if let Err(e) = reader.read_as_array_buffer(&file) {
            tracing::error!("Failed to start reading file: {:?}", e);
        }
    }

    /// Fetch a model over HTTP and queue its bytes
    pub fn fetch_model(url: String, uploads: ModelUploads) {
        wasm_bindgen_futures::spawn_local(async move {
            let upload = fetch_bytes(&url).await.map(|bytes| ModelFile {
                name: file_name_from_url(&url),
                bytes,
            });
            uploads.push(upload);
        });
    }

    async fn fetch_bytes(url: &str) -> Result<Vec<u8>, String> {
        let window = web_sys::window().ok_or("No window")?;

        let resp = wasm_bindgen_futures::JsFuture::from(window.fetch_with_str(url))
            .await
            .map_err(|e| format!("Fetch failed: {:?}", e))?;
        let resp: web_sys::Response = resp.dyn_into().map_err(|_| "Response cast failed")?;

        if !resp.ok() {
            return Err(format!("HTTP {}: {}", resp.status(), resp.status_text()));
        }

        let buffer = wasm_bindgen_futures::JsFuture::from(
            resp.array_buffer().map_err(|_| "Failed to read body")?,
        )
        .await
        .map_err(|e| format!("Body read failed: {:?}", e))?;

        Ok(js_sys::Uint8Array::new(&buffer).to_vec())
    }
}

// Non-WASM stubs
#[cfg(not(target_arch = "wasm32"))]
mod js_interop {
    use super::*;

    pub fn location_query_pairs() -> Vec<(&'static str, String)> {
        Vec::new()
    }

    pub fn open_file_picker(_accept: &str, uploads: ModelUploads) {
        uploads.push(Err("File picker not supported on this platform".to_string()));
    }

    pub fn fetch_model(url: String, uploads: ModelUploads) {
        uploads.push(Err(format!("Cannot fetch {} on this platform", url)));
    }
}

pub use js_interop::{fetch_model, location_query_pairs, open_file_picker};
