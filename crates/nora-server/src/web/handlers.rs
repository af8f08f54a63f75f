//! Request handlers bound in the route table.

use serde_json::Value;

use super::{ApiContext, ApiRequest, ApiResponse};
use crate::error::ApiError;

type HandlerResult = Result<ApiResponse, ApiError>;

pub(super) fn status(_: &ApiContext, _: &ApiRequest) -> HandlerResult {
    Ok(ApiResponse::text(200, "Nora backend is running"))
}

pub(super) fn list_projects(ctx: &ApiContext, _: &ApiRequest) -> HandlerResult {
    let projects = ctx.projects.list()?;
    Ok(ApiResponse::json(200, &projects))
}

pub(super) fn create_project(ctx: &ApiContext, request: &ApiRequest) -> HandlerResult {
    let payload = json_body(request)?;
    let name = required_field(&payload, "name")?;
    let description = payload.get("description").and_then(Value::as_str);
    let manifest = ctx.projects.create(name, description)?;
    Ok(ApiResponse::json(201, &manifest))
}

pub(super) fn project_files(ctx: &ApiContext, request: &ApiRequest) -> HandlerResult {
    let name = required_query(request, "projectName")?;
    let files = ctx.projects.files(name)?;
    Ok(ApiResponse::json(200, &files))
}

pub(super) fn delete_project_file(ctx: &ApiContext, request: &ApiRequest) -> HandlerResult {
    let payload = json_body(request)?;
    let (project, path) = project_and_path(&payload)?;
    ctx.files.delete(project, path)?;
    Ok(ApiResponse::text(200, "Deleted successfully"))
}

pub(super) fn get_file(ctx: &ApiContext, request: &ApiRequest) -> HandlerResult {
    let project = required_query(request, "projectName")?;
    let path = required_query(request, "path")?;
    let content = ctx.files.read(project, path)?;
    Ok(ApiResponse::json(200, &serde_json::json!({ "content": content })))
}

pub(super) fn create_file(ctx: &ApiContext, request: &ApiRequest) -> HandlerResult {
    let payload = json_body(request)?;
    let (project, path) = project_and_path(&payload)?;
    ctx.files.create_file(project, path)?;
    Ok(ApiResponse::text(200, "File created successfully"))
}

pub(super) fn create_folder(ctx: &ApiContext, request: &ApiRequest) -> HandlerResult {
    let payload = json_body(request)?;
    let (project, path) = project_and_path(&payload)?;
    ctx.files.create_folder(project, path)?;
    Ok(ApiResponse::text(200, "Folder created successfully"))
}

pub(super) fn update_file(ctx: &ApiContext, request: &ApiRequest) -> HandlerResult {
    let payload = json_body(request)?;
    let (project, path) = project_and_path(&payload)?;
    // Empty content is a valid update; only the type is checked.
    let content = payload
        .get("content")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::invalid("Missing or invalid 'content' field"))?;
    ctx.files.update(project, path, content)?;
    Ok(ApiResponse::text(200, "File updated successfully"))
}

fn json_body(request: &ApiRequest) -> Result<Value, ApiError> {
    serde_json::from_slice(&request.body).map_err(|_| ApiError::invalid("Invalid JSON"))
}

fn required_field<'a>(payload: &'a Value, field: &str) -> Result<&'a str, ApiError> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::invalid(format!("Missing or invalid '{field}' field")))
}

fn required_query<'a>(request: &'a ApiRequest, name: &str) -> Result<&'a str, ApiError> {
    request
        .query_param(name)
        .ok_or_else(|| ApiError::invalid(format!("Missing '{name}' query parameter")))
}

fn project_and_path(payload: &Value) -> Result<(&str, &str), ApiError> {
    Ok((
        required_field(payload, "projectName")?,
        required_field(payload, "path")?,
    ))
}
