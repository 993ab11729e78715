use super::{error_detail, NewTask, TaskStatus, TaskView, UpdateTask};
use crate::TODOS_API;
use reqwest::{self, StatusCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Todo with id {0} not found")]
    NotFound(String),

    #[error("Unexpected server error: {0}")]
    ServerError(String),
}

async fn check_response(
    response: reqwest::Response,
    id: Option<&str>,
) -> Result<reqwest::Response, TaskError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        if let Some(id) = id {
            return Err(TaskError::NotFound(id.to_string()));
        }
    }

    Err(TaskError::ServerError(error_detail(response).await))
}

pub async fn fetch_tasks(base_url: &str) -> Result<Vec<TaskView>, TaskError> {
    let url = format!("{}/{TODOS_API}/", base_url);
    let response = check_response(reqwest::get(url).await?, None).await?;
    Ok(response.json::<Vec<TaskView>>().await?)
}

pub async fn fetch_task(base_url: &str, id: &str) -> Result<TaskView, TaskError> {
    let url = format!("{}/{TODOS_API}/{}", base_url, id);
    let response = check_response(reqwest::get(url).await?, Some(id)).await?;
    Ok(response.json::<TaskView>().await?)
}

pub async fn create_task(base_url: &str, task: NewTask) -> Result<TaskView, TaskError> {
    let client = reqwest::Client::new();
    let url = format!("{}/{TODOS_API}/", base_url);
    let response = client.post(url).json(&task).send().await?;
    let response = check_response(response, None).await?;
    Ok(response.json::<TaskView>().await?)
}

pub async fn update_task(
    base_url: &str,
    id: &str,
    changes: UpdateTask,
) -> Result<TaskView, TaskError> {
    let client = reqwest::Client::new();
    let url = format!("{}/{TODOS_API}/{}", base_url, id);
    let response = client.put(url).json(&changes).send().await?;
    let response = check_response(response, Some(id)).await?;
    Ok(response.json::<TaskView>().await?)
}

pub async fn delete_task(base_url: &str, id: &str) -> Result<(), TaskError> {
    let client = reqwest::Client::new();
    let url = format!("{}/{TODOS_API}/{}", base_url, id);
    let response = client.delete(url).send().await?;
    check_response(response, Some(id)).await?;
    Ok(())
}

pub async fn toggle_task(base_url: &str, id: &str) -> Result<TaskView, TaskError> {
    let client = reqwest::Client::new();
    let url = format!("{}/{TODOS_API}/{}/toggle", base_url, id);
    let response = client.patch(url).send().await?;
    let response = check_response(response, Some(id)).await?;
    Ok(response.json::<TaskView>().await?)
}

/// Tasks with the given status, or every task when `status` is `None`.
pub async fn filter_tasks(
    base_url: &str,
    status: Option<TaskStatus>,
) -> Result<Vec<TaskView>, TaskError> {
    let client = reqwest::Client::new();
    let url = format!("{}/{TODOS_API}/filter/", base_url);
    let mut request = client.get(url);
    if let Some(status) = status {
        request = request.query(&[("status", status.as_str())]);
    }
    let response = check_response(request.send().await?, None).await?;
    Ok(response.json::<Vec<TaskView>>().await?)
}
