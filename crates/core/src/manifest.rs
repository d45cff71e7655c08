//! Manifest normalization: wire formats to canonical update records.
//!
//! Three wire formats are recognized, probed in a fixed order:
//! 1. modern: nested object with an explicit `launchAsset`, possibly
//!    wrapped in a `manifest` key and/or extra envelope keys,
//! 2. legacy: flat object with `bundleUrl`/`sdkVersion`,
//! 3. bare: minimal `{"id", "commitTime"}` for fully embedded builds.
//!
//! Each format declares its own required-field set; a missing or mistyped
//! required field is a `MalformedManifest` error, never a silent default.

use crate::config::UpdatesConfig;
use crate::hash::AssetHash;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

/// How deep envelope unwrapping will search for a modern manifest body.
const MAX_ENVELOPE_DEPTH: u8 = 8;

/// Relative path of the synthesized launch asset of a bare manifest.
const EMBEDDED_BUNDLE_PATH: &str = "app.bundle";

/// Content type assigned to launch bundles that do not declare one.
const BUNDLE_CONTENT_TYPE: &str = "application/javascript";

/// A canonical, format-independent update record produced by normalization.
#[derive(Clone, Debug)]
pub struct Update {
    /// Globally unique update id, taken verbatim from the manifest.
    pub id: Uuid,
    /// Publisher-assigned creation time; newest wins on ties.
    pub commit_time: OffsetDateTime,
    /// Runtime version this update is compatible with.
    pub runtime_version: String,
    /// Scope key partitioning the local store, from configuration.
    pub scope_key: String,
    /// The full manifest body, kept for later filter matching.
    pub manifest: Value,
}

/// One file referenced by a normalized update.
#[derive(Clone, Debug)]
pub struct NewAsset {
    /// Content hash / dedup key. Hex SHA-256 where the manifest declared a
    /// hash, an opaque manifest-supplied key otherwise.
    pub key: String,
    /// Remote download URL. None for embedded assets.
    pub url: Option<String>,
    /// Local storage key relative to the asset directory.
    pub relative_path: String,
    /// MIME type, if declared.
    pub content_type: Option<String>,
    /// Whether this asset is the update's entry bundle.
    pub is_launch_asset: bool,
}

/// The output of normalization: one update plus its assets.
///
/// Exactly one asset has `is_launch_asset` set.
#[derive(Clone, Debug)]
pub struct NormalizedUpdate {
    pub update: Update,
    pub assets: Vec<NewAsset>,
}

/// Normalize a raw manifest in any supported wire format.
///
/// Probes formats in fixed order; the first format whose shape-check claims
/// the input parses it, and its required-field errors are surfaced rather
/// than falling through to the next format.
pub fn normalize_manifest(raw: &Value, config: &UpdatesConfig) -> crate::Result<NormalizedUpdate> {
    if let Some(manifest) = find_modern_body(raw, MAX_ENVELOPE_DEPTH) {
        return parse_modern(manifest, config);
    }
    if let Some(obj) = raw.as_object() {
        if probe_legacy(obj) {
            return parse_legacy(raw, obj, config);
        }
        if probe_bare(obj) {
            return parse_bare(raw, obj, config);
        }
    }
    Err(crate::Error::UnrecognizedManifest(
        "no launchAsset, bundleUrl, or bare id/commitTime shape".into(),
    ))
}

/// Locate a modern manifest body, unwrapping `manifest` wrappers and extra
/// envelope keys (e.g. `{"data":{"publicManifest":{"manifest":{...}}}}`).
fn find_modern_body(value: &Value, depth: u8) -> Option<&Value> {
    if depth == 0 {
        return None;
    }
    let obj = value.as_object()?;
    if obj.contains_key("launchAsset") {
        return Some(value);
    }
    if let Some(inner) = obj.get("manifest") {
        if let Some(found) = find_modern_body(inner, depth - 1) {
            return Some(found);
        }
    }
    for inner in obj.values() {
        if let Some(found) = find_modern_body(inner, depth - 1) {
            return Some(found);
        }
    }
    None
}

fn probe_legacy(obj: &serde_json::Map<String, Value>) -> bool {
    obj.contains_key("bundleUrl")
        || obj.contains_key("sdkVersion")
        || obj.contains_key("releaseId")
}

fn probe_bare(obj: &serde_json::Map<String, Value>) -> bool {
    obj.contains_key("id") && obj.contains_key("commitTime")
}

fn parse_modern(manifest: &Value, config: &UpdatesConfig) -> crate::Result<NormalizedUpdate> {
    let obj = manifest
        .as_object()
        .ok_or_else(|| crate::Error::malformed("manifest", "expected an object"))?;

    let id = parse_update_id(obj.get("id"), "id")?;
    let commit_time = parse_commit_time(
        obj.get("createdAt").or_else(|| obj.get("commitTime")),
        "createdAt",
    )?;
    let runtime_version = required_str(obj.get("runtimeVersion"), "runtimeVersion")?.to_string();

    let launch_asset = obj
        .get("launchAsset")
        .ok_or_else(|| crate::Error::malformed("launchAsset", "missing"))?;
    let mut assets = vec![parse_modern_asset(launch_asset, true, "launchAsset")?];

    if let Some(extra) = obj.get("assets") {
        let list = extra
            .as_array()
            .ok_or_else(|| crate::Error::malformed("assets", "expected an array"))?;
        for asset in list {
            assets.push(parse_modern_asset(asset, false, "assets")?);
        }
    }

    Ok(NormalizedUpdate {
        update: Update {
            id,
            commit_time,
            runtime_version,
            scope_key: config.scope_key.clone(),
            manifest: manifest.clone(),
        },
        assets,
    })
}

fn parse_modern_asset(
    value: &Value,
    is_launch_asset: bool,
    field: &'static str,
) -> crate::Result<NewAsset> {
    let obj = value
        .as_object()
        .ok_or_else(|| crate::Error::malformed(field, "expected an object"))?;

    let url = required_str(obj.get("url"), field)?.to_string();

    // Prefer a declared content hash as the dedup key; fall back to the
    // manifest-supplied opaque key.
    let key = match obj.get("hash") {
        Some(Value::String(hash)) => AssetHash::from_base64url(hash)
            .map_err(|e| crate::Error::malformed(field, format!("invalid asset hash: {e}")))?
            .to_hex(),
        Some(_) => return Err(crate::Error::malformed(field, "hash must be a string")),
        None => match obj.get("key") {
            Some(Value::String(key)) if !key.is_empty() => key.clone(),
            _ => return Err(crate::Error::malformed(field, "missing asset key or hash")),
        },
    };

    let extension = obj
        .get("fileExtension")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let content_type = obj
        .get("contentType")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| is_launch_asset.then(|| BUNDLE_CONTENT_TYPE.to_string()));

    Ok(NewAsset {
        relative_path: format!("{key}{extension}"),
        key,
        url: Some(url),
        content_type,
        is_launch_asset,
    })
}

fn parse_legacy(
    raw: &Value,
    obj: &serde_json::Map<String, Value>,
    config: &UpdatesConfig,
) -> crate::Result<NormalizedUpdate> {
    let id = parse_update_id(obj.get("releaseId").or_else(|| obj.get("id")), "releaseId")?;
    let commit_time = parse_commit_time(obj.get("commitTime"), "commitTime")?;
    let runtime_version = required_str(obj.get("sdkVersion"), "sdkVersion")?.to_string();
    let bundle_url = required_str(obj.get("bundleUrl"), "bundleUrl")?.to_string();

    // Legacy manifests carry no content hash; the dedup key is derived from
    // the bundle URL so re-observations of the same release share one asset.
    let key = AssetHash::compute(bundle_url.as_bytes()).to_hex();
    let launch_asset = NewAsset {
        relative_path: format!("{key}.bundle"),
        key,
        url: Some(bundle_url),
        content_type: Some(BUNDLE_CONTENT_TYPE.to_string()),
        is_launch_asset: true,
    };

    Ok(NormalizedUpdate {
        update: Update {
            id,
            commit_time,
            runtime_version,
            scope_key: config.scope_key.clone(),
            manifest: raw.clone(),
        },
        assets: vec![launch_asset],
    })
}

fn parse_bare(
    raw: &Value,
    obj: &serde_json::Map<String, Value>,
    config: &UpdatesConfig,
) -> crate::Result<NormalizedUpdate> {
    let id = parse_update_id(obj.get("id"), "id")?;
    let commit_time = parse_commit_time(obj.get("commitTime"), "commitTime")?;

    // Embedded bundles ship inside the host binary: no remote URL, and the
    // runtime version is the host's own.
    let launch_asset = NewAsset {
        key: AssetHash::compute(id.as_bytes()).to_hex(),
        url: None,
        relative_path: EMBEDDED_BUNDLE_PATH.to_string(),
        content_type: Some(BUNDLE_CONTENT_TYPE.to_string()),
        is_launch_asset: true,
    };

    Ok(NormalizedUpdate {
        update: Update {
            id,
            commit_time,
            runtime_version: config.runtime_version.clone(),
            scope_key: config.scope_key.clone(),
            manifest: raw.clone(),
        },
        assets: vec![launch_asset],
    })
}

fn required_str<'a>(value: Option<&'a Value>, field: &'static str) -> crate::Result<&'a str> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(Value::String(_)) => Err(crate::Error::malformed(field, "empty string")),
        Some(_) => Err(crate::Error::malformed(field, "expected a string")),
        None => Err(crate::Error::malformed(field, "missing")),
    }
}

fn parse_update_id(value: Option<&Value>, field: &'static str) -> crate::Result<Uuid> {
    let raw = required_str(value, field)?;
    Uuid::parse_str(raw).map_err(|e| crate::Error::malformed(field, format!("invalid UUID: {e}")))
}

/// Parse a manifest timestamp: RFC 3339 string or unix milliseconds.
fn parse_commit_time(
    value: Option<&Value>,
    field: &'static str,
) -> crate::Result<OffsetDateTime> {
    match value {
        Some(Value::String(s)) => OffsetDateTime::parse(s, &Rfc3339)
            .map_err(|e| crate::Error::malformed(field, format!("invalid timestamp: {e}"))),
        Some(Value::Number(n)) => {
            let millis = n
                .as_i64()
                .ok_or_else(|| crate::Error::malformed(field, "timestamp out of range"))?;
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
                .map_err(|e| crate::Error::malformed(field, format!("timestamp out of range: {e}")))
        }
        Some(_) => Err(crate::Error::malformed(
            field,
            "expected a string or integer",
        )),
        None => Err(crate::Error::malformed(field, "missing")),
    }
}
