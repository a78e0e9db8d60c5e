use actix_web::{web, HttpResponse};
use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

use crate::auth::AdminUser;
use crate::config::AppConfig;
use crate::entity::comment;
use crate::error::AppError;
use crate::moderation::filter::ContentFilter;
use crate::moderation::policy::{self, CommentState, ModerationAction};
use crate::response::ResponseDto;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/add").route(web::post().to(add)))
        .service(web::resource("/query").route(web::post().to(query)))
        .service(web::resource("/queue").route(web::post().to(queue)))
        .service(web::resource("/approve").route(web::post().to(approve)))
        .service(web::resource("/archive").route(web::post().to(archive)))
        .service(web::resource("/unarchive").route(web::post().to(unarchive)))
        .service(web::resource("/remove").route(web::post().to(remove)));
}

const MAX_CONTENT_CHARS: usize = 2000;

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("invalid email regex"));

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveCommentRequest {
    post_id: String,
    author_name: String,
    author_email: Option<String>,
    content: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryCommentListRequest {
    post_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueueRequest {
    page: u64,
    size: u64,
    /// pending | flagged | archived | all
    filter: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueueResponse {
    total: u64,
    total_page: u64,
    list: Vec<AdminCommentDto>,
}

/// Payload for public rendering. Deliberately excludes the author email and
/// the moderation flags.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicCommentDto {
    id: i32,
    post_id: String,
    author_name: String,
    content: String,
    created: String,
}

impl From<comment::Model> for PublicCommentDto {
    fn from(m: comment::Model) -> Self {
        let created = to_rfc3339(&m);
        Self {
            id: m.id,
            post_id: m.post_id,
            author_name: m.author_name,
            content: m.content,
            created,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AdminCommentDto {
    id: i32,
    post_id: String,
    author_name: String,
    author_email: Option<String>,
    content: String,
    created: String,
    approved: bool,
    archived: bool,
    flagged: bool,
    state: String,
}

impl From<comment::Model> for AdminCommentDto {
    fn from(m: comment::Model) -> Self {
        let state = CommentState::of(m.approved, m.archived).as_str().to_string();
        let created = to_rfc3339(&m);
        Self {
            id: m.id,
            created,
            post_id: m.post_id,
            author_name: m.author_name,
            author_email: m.author_email,
            content: m.content,
            approved: m.approved,
            archived: m.archived,
            flagged: m.flagged,
            state,
        }
    }
}

fn to_rfc3339(m: &comment::Model) -> String {
    m.created.to_rfc3339_opts(SecondsFormat::Millis, false)
}

#[derive(Debug)]
struct ValidSubmission {
    post_id: String,
    author_name: String,
    author_email: Option<String>,
    content: String,
}

fn validate_submission(payload: &SaveCommentRequest) -> Result<ValidSubmission, AppError> {
    let post_id = payload.post_id.trim();
    if post_id.is_empty() {
        return Err(AppError::param_error("postId is required"));
    }

    let author_name = payload.author_name.trim();
    if author_name.is_empty() {
        return Err(AppError::param_error("authorName is required"));
    }

    let content = payload.content.trim();
    if content.is_empty() {
        return Err(AppError::param_error("content is required"));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(AppError::param_error("content exceeds 2000 characters"));
    }

    let author_email = match payload.author_email.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(email) => {
            if !EMAIL_REGEX.is_match(email) {
                return Err(AppError::param_error("authorEmail is invalid"));
            }
            Some(email.to_string())
        }
    };

    Ok(ValidSubmission {
        post_id: post_id.to_string(),
        author_name: author_name.to_string(),
        author_email,
        content: content.to_string(),
    })
}

/// Public submission entry point. Validates, runs the content filter, and
/// stores the comment with `approved` computed from the verdict: clean
/// content is approved at write time, everything else waits for an operator
/// or the read-time window.
async fn add(
    db: web::Data<DatabaseConnection>,
    filter: web::Data<ContentFilter>,
    payload: web::Json<SaveCommentRequest>,
) -> Result<HttpResponse, AppError> {
    let submission = validate_submission(&payload)?;

    let verdict = filter.evaluate(&submission.content).await;
    if verdict.rejected {
        log::info!(
            "comment for post {} rejected by content filter: {:?}",
            submission.post_id,
            verdict.reasons
        );
        return Err(AppError::policy_rejected());
    }

    let model = comment::ActiveModel {
        post_id: Set(submission.post_id),
        author_name: Set(submission.author_name),
        author_email: Set(submission.author_email),
        content: Set(submission.content),
        created: Set(Utc::now()),
        approved: Set(verdict.should_auto_approve),
        archived: Set(false),
        flagged: Set(verdict.flagged),
        ..Default::default()
    };

    let created = model
        .insert(db.get_ref())
        .await
        .map_err(|_| AppError::system_exception())?;

    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(PublicCommentDto::from(created)))))
}

/// Public read surface: visibility-projected, newest first, capped.
async fn query(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    payload: web::Json<QueryCommentListRequest>,
) -> Result<HttpResponse, AppError> {
    let rows = comment::Entity::find()
        .filter(comment::Column::PostId.eq(payload.post_id.trim()))
        .filter(comment::Column::Archived.eq(false))
        .all(db.get_ref())
        .await
        .map_err(|_| AppError::system_exception())?;

    let moderation = &config.moderation;
    let visible = policy::visible_to_public(
        rows,
        Utc::now(),
        moderation.auto_approve_hours,
        moderation.public_page_limit,
    );

    let list: Vec<PublicCommentDto> = visible.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(list))))
}

/// Moderation queue listing for operators, newest first.
async fn queue(
    db: web::Data<DatabaseConnection>,
    _auth: AdminUser,
    payload: web::Json<QueueRequest>,
) -> Result<HttpResponse, AppError> {
    let page = payload.page.max(1);
    let size = payload.size.max(1);

    let mut select = comment::Entity::find();
    match payload.filter.as_deref().unwrap_or("pending") {
        "pending" => {
            select = select
                .filter(comment::Column::Approved.eq(false))
                .filter(comment::Column::Archived.eq(false));
        }
        "flagged" => {
            select = select
                .filter(comment::Column::Flagged.eq(true))
                .filter(comment::Column::Archived.eq(false));
        }
        "archived" => {
            select = select.filter(comment::Column::Archived.eq(true));
        }
        "all" => {}
        other => {
            return Err(AppError::param_error(format!("unknown filter: {}", other)));
        }
    }

    let paginator = select
        .order_by_desc(comment::Column::Id)
        .paginate(db.get_ref(), size);
    let total = paginator
        .num_items()
        .await
        .map_err(|_| AppError::system_exception())?;
    let rows = paginator
        .fetch_page(page - 1)
        .await
        .map_err(|_| AppError::system_exception())?;

    let total_page = if total % size == 0 { total / size } else { total / size + 1 };
    let response = QueueResponse {
        total,
        total_page,
        list: rows.into_iter().map(Into::into).collect(),
    };
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(response))))
}

#[derive(Deserialize)]
struct ModerateQuery {
    id: i32,
}

/// Load, run the transition function, persist only on change. Idempotent
/// actions return the unchanged record as a success.
async fn moderate(
    db: &DatabaseConnection,
    id: i32,
    action: ModerationAction,
) -> Result<comment::Model, AppError> {
    let row = comment::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(|_| AppError::system_exception())?
        .ok_or_else(|| AppError::not_found("comment not found"))?;

    let (approved, archived) =
        policy::apply_action(row.approved, row.archived, action).map_err(|e| AppError::guard(e.to_string()))?;

    if approved == row.approved && archived == row.archived {
        return Ok(row);
    }

    let mut active: comment::ActiveModel = row.into();
    active.approved = Set(approved);
    active.archived = Set(archived);
    active
        .update(db)
        .await
        .map_err(|_| AppError::system_exception())
}

async fn approve(
    db: web::Data<DatabaseConnection>,
    _auth: AdminUser,
    query: web::Query<ModerateQuery>,
) -> Result<HttpResponse, AppError> {
    let updated = moderate(db.get_ref(), query.id, ModerationAction::Approve).await?;
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(AdminCommentDto::from(updated)))))
}

async fn archive(
    db: web::Data<DatabaseConnection>,
    _auth: AdminUser,
    query: web::Query<ModerateQuery>,
) -> Result<HttpResponse, AppError> {
    let updated = moderate(db.get_ref(), query.id, ModerationAction::Archive).await?;
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(AdminCommentDto::from(updated)))))
}

async fn unarchive(
    db: web::Data<DatabaseConnection>,
    _auth: AdminUser,
    query: web::Query<ModerateQuery>,
) -> Result<HttpResponse, AppError> {
    let updated = moderate(db.get_ref(), query.id, ModerationAction::Unarchive).await?;
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(AdminCommentDto::from(updated)))))
}

/// Terminal delete. The confirmation step lives at the interaction
/// boundary; there is no undo here.
async fn remove(
    db: web::Data<DatabaseConnection>,
    _auth: AdminUser,
    query: web::Query<ModerateQuery>,
) -> Result<HttpResponse, AppError> {
    comment::Entity::find_by_id(query.id)
        .one(db.get_ref())
        .await
        .map_err(|_| AppError::system_exception())?
        .ok_or_else(|| AppError::not_found("comment not found"))?;

    comment::Entity::delete_by_id(query.id)
        .exec(db.get_ref())
        .await
        .map_err(|_| AppError::system_exception())?;

    Ok(HttpResponse::Ok().json(ResponseDto::<()>::success(None)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: Option<&str>, content: &str) -> SaveCommentRequest {
        SaveCommentRequest {
            post_id: "post-1".to_string(),
            author_name: "reader".to_string(),
            author_email: email.map(|e| e.to_string()),
            content: content.to_string(),
        }
    }

    #[test]
    fn validation_trims_and_accepts() {
        let valid = validate_submission(&request(Some(" reader@example.com "), "  hello  ")).unwrap();
        assert_eq!(valid.content, "hello");
        assert_eq!(valid.author_email.as_deref(), Some("reader@example.com"));
    }

    #[test]
    fn validation_rejects_blank_content() {
        let err = validate_submission(&request(None, "   ")).unwrap_err();
        assert_eq!(err.code(), 1);
    }

    #[test]
    fn validation_rejects_overlong_content() {
        let long = "x".repeat(MAX_CONTENT_CHARS + 1);
        let err = validate_submission(&request(None, &long)).unwrap_err();
        assert_eq!(err.code(), 1);
        // exactly at the limit passes
        let at_limit = "x".repeat(MAX_CONTENT_CHARS);
        assert!(validate_submission(&request(None, &at_limit)).is_ok());
    }

    #[test]
    fn validation_rejects_malformed_email() {
        for email in ["not-an-email", "a@b", "a b@c.com", "@domain.com"] {
            let err = validate_submission(&request(Some(email), "hello")).unwrap_err();
            assert_eq!(err.code(), 1, "expected rejection for {}", email);
        }
    }

    #[test]
    fn empty_email_treated_as_absent() {
        let valid = validate_submission(&request(Some("  "), "hello")).unwrap();
        assert!(valid.author_email.is_none());
    }
}
