//! Process-wide model registry.
//!
//! Models are built the first time a name is requested and then shared by reference for
//! the rest of the process. Unknown names fail with [`ModelLoadError`].

use crate::answer::{Answerer, LexicalSpanAnswerer, LEXICAL_SPAN_MODEL};
use crate::embeddings::{
    CharacterNgramEmbedder, Embedder, TokenHashEmbedder, CHARACTER_NGRAM_MODEL, TOKEN_HASH_MODEL,
};
use crate::error::ModelLoadError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::info;

pub type SharedEmbedder = Arc<dyn Embedder>;
pub type SharedAnswerer = Arc<dyn Answerer>;

pub const EMBEDDING_MODELS: &[&str] = &[CHARACTER_NGRAM_MODEL, TOKEN_HASH_MODEL];
pub const QA_MODELS: &[&str] = &[LEXICAL_SPAN_MODEL];

static EMBEDDERS: OnceLock<Mutex<HashMap<String, SharedEmbedder>>> = OnceLock::new();
static ANSWERERS: OnceLock<Mutex<HashMap<String, SharedAnswerer>>> = OnceLock::new();

fn load_or_insert<T: ?Sized>(
    cache: &'static OnceLock<Mutex<HashMap<String, Arc<T>>>>,
    name: &str,
    load: impl FnOnce() -> Result<Arc<T>, ModelLoadError>,
) -> Result<Arc<T>, ModelLoadError> {
    let mut models = cache
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .map_err(|_| ModelLoadError::new(name, "model registry lock poisoned"))?;

    if let Some(model) = models.get(name) {
        return Ok(Arc::clone(model));
    }

    let model = load()?;
    info!(model = name, "model loaded");
    models.insert(name.to_string(), Arc::clone(&model));
    Ok(model)
}

pub fn embedder(name: &str) -> Result<SharedEmbedder, ModelLoadError> {
    load_or_insert(&EMBEDDERS, name, || match name {
        CHARACTER_NGRAM_MODEL => Ok(Arc::new(CharacterNgramEmbedder::default()) as SharedEmbedder),
        TOKEN_HASH_MODEL => Ok(Arc::new(TokenHashEmbedder::new(256)?) as SharedEmbedder),
        other => Err(ModelLoadError::new(
            other,
            format!("unknown embedding model, expected one of {EMBEDDING_MODELS:?}"),
        )),
    })
}

pub fn answerer(name: &str) -> Result<SharedAnswerer, ModelLoadError> {
    load_or_insert(&ANSWERERS, name, || match name {
        LEXICAL_SPAN_MODEL => Ok(Arc::new(LexicalSpanAnswerer::new()?) as SharedAnswerer),
        other => Err(ModelLoadError::new(
            other,
            format!("unknown qa model, expected one of {QA_MODELS:?}"),
        )),
    })
}
