//! Create/read/update/delete over an [`AnnotationStore`].
//!
//! Every operation checks existence, conflicts and permissions before
//! touching the store, so a failed request never leaves a partial write.

use std::sync::Arc;

use axum::http::Method;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument};

use catch_core::catcha::is_legacy;
use catch_core::{
    has_permission, Annotation, AnnotationStore, Catcha, Error, Operation, OverrideFlag,
    Permissions, Result, TokenClaims,
};

/// Per-record import failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportFailure {
    pub id: String,
    pub msg: String,
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub total_success: usize,
    pub total_failed: usize,
    pub success: Vec<String>,
    pub failure: Vec<ImportFailure>,
}

/// Parse a request body; an empty body is `None`.
pub fn parse_body(bytes: &[u8]) -> Result<Option<JsonValue>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(bytes)
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("invalid json in request body: {}", e)))
}

/// Annotation lifecycle service.
#[derive(Clone)]
pub struct CrudService {
    store: Arc<dyn AnnotationStore>,
}

impl CrudService {
    pub fn new(store: Arc<dyn AnnotationStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn AnnotationStore> {
        &self.store
    }

    // =========================================================================
    // DISPATCH
    // =========================================================================

    /// Route a request on `/annos/{id}` by method.
    ///
    /// POST creates; every other method needs an existing live record and
    /// the permission mapped from the method.
    #[instrument(
        skip(self, claims, body),
        fields(subsystem = "crud", op = %method, anno_id = %id, user_id = %claims.user_id)
    )]
    pub async fn handle(
        &self,
        method: &Method,
        claims: &TokenClaims,
        id: &str,
        body: Option<JsonValue>,
    ) -> Result<Annotation> {
        let existing = self.live(id).await?;

        let Some(anno) = existing else {
            if *method == Method::POST {
                return self.create_checked(claims, id, body).await;
            }
            return Err(not_found(id));
        };

        if *method == Method::POST {
            return Err(duplicate(id));
        }
        let op = Operation::for_method(method.as_str())
            .ok_or_else(|| Error::MethodNotAllowed(format!("method ({}) not allowed", method)))?;
        require(op, claims, &anno)?;

        match op {
            Operation::Read => Ok(anno),
            Operation::Update => self.apply_update(claims, anno, body).await,
            Operation::Delete => self.apply_delete(anno).await,
            Operation::Admin => Err(Error::MethodNotAllowed(format!(
                "method ({}) not allowed",
                method
            ))),
        }
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Create a record with `id` from `input`.
    pub async fn create(
        &self,
        claims: &TokenClaims,
        id: &str,
        input: Option<JsonValue>,
    ) -> Result<Annotation> {
        if self.store.get(id).await?.is_some() {
            return Err(duplicate(id));
        }
        self.create_checked(claims, id, input).await
    }

    pub async fn read(&self, claims: &TokenClaims, id: &str) -> Result<Annotation> {
        let anno = self.live(id).await?.ok_or_else(|| not_found(id))?;
        require(Operation::Read, claims, &anno)?;
        Ok(anno)
    }

    pub async fn update(
        &self,
        claims: &TokenClaims,
        id: &str,
        input: Option<JsonValue>,
    ) -> Result<Annotation> {
        let anno = self.live(id).await?.ok_or_else(|| not_found(id))?;
        require(Operation::Update, claims, &anno)?;
        self.apply_update(claims, anno, input).await
    }

    /// Update through the legacy route; same rules as [`Self::update`].
    #[instrument(
        skip(self, claims, input),
        fields(subsystem = "crud", op = "compat_update", anno_id = %id, user_id = %claims.user_id)
    )]
    pub async fn compat_update(
        &self,
        claims: &TokenClaims,
        id: &str,
        input: Option<JsonValue>,
    ) -> Result<Annotation> {
        self.update(claims, id, input).await
    }

    /// Soft delete: the record stays in the store flagged as deleted.
    pub async fn delete(&self, claims: &TokenClaims, id: &str) -> Result<Annotation> {
        let anno = self.live(id).await?.ok_or_else(|| not_found(id))?;
        require(Operation::Delete, claims, &anno)?;
        self.apply_delete(anno).await
    }

    /// Bulk insert of pre-formed records, skipping ACL checks.
    ///
    /// Only the admin identity or a `CAN_ADMIN` token may import. A failing
    /// record is reported and the rest of the batch continues.
    #[instrument(
        skip(self, claims, records),
        fields(subsystem = "crud", op = "import", user_id = %claims.user_id, count = records.len())
    )]
    pub async fn import(
        &self,
        claims: &TokenClaims,
        records: Vec<JsonValue>,
    ) -> Result<ImportSummary> {
        if !claims.is_admin() && !claims.has_override(OverrideFlag::CanAdmin) {
            return Err(Error::NoPermissionForOperation(format!(
                "user({}) not allowed to import",
                claims.user_id
            )));
        }

        let mut summary = ImportSummary::default();
        for record in records {
            let id = record_id(&record);
            match self.import_one(record).await {
                Ok(anno) => summary.success.push(anno.id),
                Err(e) => {
                    debug!(anno_id = %id, error = %e, "Import record failed");
                    summary.failure.push(ImportFailure {
                        id,
                        msg: e.to_string(),
                    });
                }
            }
        }
        summary.total_success = summary.success.len();
        summary.total_failed = summary.failure.len();

        info!(
            total_success = summary.total_success,
            failed_count = summary.total_failed,
            "Import complete"
        );
        Ok(summary)
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    /// Stored record unless absent or soft-deleted.
    async fn live(&self, id: &str) -> Result<Option<Annotation>> {
        Ok(self.store.get(id).await?.filter(|a| !a.deleted))
    }

    async fn create_checked(
        &self,
        claims: &TokenClaims,
        id: &str,
        input: Option<JsonValue>,
    ) -> Result<Annotation> {
        let mut input = require_input(input)?;
        let legacy = is_legacy(&input);
        let obj = input
            .as_object_mut()
            .ok_or_else(|| Error::InvalidInput("annotation must be a json object".to_string()))?;
        obj.insert("id".to_string(), JsonValue::String(id.to_string()));
        if !obj.contains_key("permissions") && !legacy {
            obj.insert(
                "permissions".to_string(),
                serde_json::to_value(Permissions::default_for(&claims.user_id))?,
            );
        }

        let catcha = Catcha::normalize(input)?;
        if !claims.is_admin() && catcha.creator.id != claims.user_id {
            return Err(Error::InvalidAnnotationCreator(format!(
                "anno({}): conflict in input creator_id({}) does not match requesting_user({}) - not created",
                id, catcha.creator.id, claims.user_id
            )));
        }
        self.check_reply_parent(&catcha).await?;

        let now = Utc::now();
        let stored = self.store.insert(&Annotation::new(catcha, now, now)).await?;
        info!(anno_id = %stored.id, user_id = %claims.user_id, "Annotation created");
        Ok(stored)
    }

    async fn apply_update(
        &self,
        claims: &TokenClaims,
        anno: Annotation,
        input: Option<JsonValue>,
    ) -> Result<Annotation> {
        let mut input = require_input(input)?;
        if let Some(obj) = input.as_object_mut() {
            obj.insert("id".to_string(), JsonValue::String(anno.id.clone()));
        }
        let mut catcha = Catcha::normalize(input)?;

        if !catcha.permissions.same_grants(&anno.permissions) {
            require_admin(claims, &anno)?;
        }
        catcha.creator = anno.raw.creator.clone();
        if catcha.reply_to() != anno.reply_to {
            self.check_reply_parent(&catcha).await?;
        }

        let updated = Annotation::new(catcha, anno.created, Utc::now());
        let stored = self.store.save(&updated).await?;
        info!(anno_id = %stored.id, user_id = %claims.user_id, "Annotation updated");
        Ok(stored)
    }

    async fn apply_delete(&self, mut anno: Annotation) -> Result<Annotation> {
        anno.soft_delete(Utc::now());
        let stored = self.store.save(&anno).await?;
        info!(anno_id = %stored.id, "Annotation soft-deleted");
        Ok(stored)
    }

    async fn import_one(&self, record: JsonValue) -> Result<Annotation> {
        let catcha = Catcha::normalize(record)?;
        if catcha.id.trim().is_empty() {
            return Err(Error::InvalidInput(
                "missing id in import record, not created".to_string(),
            ));
        }
        if self.store.get(&catcha.id).await?.is_some() {
            return Err(duplicate(&catcha.id));
        }
        let now = Utc::now();
        let created = catcha.created.unwrap_or(now);
        let modified = catcha.modified.unwrap_or(created);
        self.store
            .insert(&Annotation::new(catcha, created, modified))
            .await
    }

    async fn check_reply_parent(&self, catcha: &Catcha) -> Result<()> {
        if let Some(parent) = catcha.reply_to() {
            if self.live(&parent).await?.is_none() {
                return Err(Error::InvalidInput(format!(
                    "anno({}): reply target anno({}) not found",
                    catcha.id, parent
                )));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for CrudService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrudService").finish_non_exhaustive()
    }
}

fn require(op: Operation, claims: &TokenClaims, anno: &Annotation) -> Result<()> {
    if has_permission(op, &claims.user_id, anno, &claims.overrides) {
        return Ok(());
    }
    Err(Error::NoPermissionForOperation(format!(
        "no permission to {} anno({}) for user({})",
        op, anno.id, claims.user_id
    )))
}

fn require_admin(claims: &TokenClaims, anno: &Annotation) -> Result<()> {
    if has_permission(Operation::Admin, &claims.user_id, anno, &claims.overrides) {
        return Ok(());
    }
    let msg = format!(
        "user({}) not allowed to admin anno({})",
        claims.user_id, anno.id
    );
    info!(subsystem = "crud", anno_id = %anno.id, "{}", msg);
    Err(Error::NoPermissionForOperation(msg))
}

fn require_input(input: Option<JsonValue>) -> Result<JsonValue> {
    input.ok_or_else(|| {
        Error::MissingAnnotationInput("missing json in body request for create/update".to_string())
    })
}

fn not_found(id: &str) -> Error {
    Error::MissingAnnotation(format!("anno({}) not found", id))
}

fn duplicate(id: &str) -> Error {
    Error::DuplicateAnnotationId(format!("anno({}): already exists, failed to create", id))
}

fn record_id(record: &JsonValue) -> String {
    match record.get("id") {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(b"").unwrap(), None);
        assert_eq!(parse_body(b"  \n").unwrap(), None);
        assert_eq!(parse_body(br#"{"a":1}"#).unwrap().unwrap()["a"], 1);
        assert_eq!(parse_body(b"{nope").unwrap_err().status(), 400);
    }

    #[test]
    fn test_record_id() {
        assert_eq!(record_id(&serde_json::json!({"id": 12})), "12");
        assert_eq!(record_id(&serde_json::json!({"id": "x"})), "x");
        assert_eq!(record_id(&serde_json::json!({})), "");
    }
}
