use super::{error_detail, Memo, NewMemo, UpdateMemo};
use crate::MEMOS_API;
use reqwest::{self, StatusCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Memo with id {0} not found")]
    NotFound(String),

    #[error("Unexpected server error: {0}")]
    ServerError(String),
}

async fn check_response(
    response: reqwest::Response,
    id: Option<&str>,
) -> Result<reqwest::Response, MemoError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        if let Some(id) = id {
            return Err(MemoError::NotFound(id.to_string()));
        }
    }

    Err(MemoError::ServerError(error_detail(response).await))
}

pub async fn fetch_memos(base_url: &str) -> Result<Vec<Memo>, MemoError> {
    let url = format!("{}/{MEMOS_API}/", base_url);
    let response = check_response(reqwest::get(url).await?, None).await?;
    Ok(response.json::<Vec<Memo>>().await?)
}

pub async fn fetch_memo(base_url: &str, id: &str) -> Result<Memo, MemoError> {
    let url = format!("{}/{MEMOS_API}/{}", base_url, id);
    let response = check_response(reqwest::get(url).await?, Some(id)).await?;
    Ok(response.json::<Memo>().await?)
}

pub async fn create_memo(base_url: &str, memo: NewMemo) -> Result<Memo, MemoError> {
    let client = reqwest::Client::new();
    let url = format!("{}/{MEMOS_API}/", base_url);
    let response = client.post(url).json(&memo).send().await?;
    let response = check_response(response, None).await?;
    Ok(response.json::<Memo>().await?)
}

pub async fn update_memo(base_url: &str, id: &str, changes: UpdateMemo) -> Result<Memo, MemoError> {
    let client = reqwest::Client::new();
    let url = format!("{}/{MEMOS_API}/{}", base_url, id);
    let response = client.put(url).json(&changes).send().await?;
    let response = check_response(response, Some(id)).await?;
    Ok(response.json::<Memo>().await?)
}

pub async fn delete_memo(base_url: &str, id: &str) -> Result<(), MemoError> {
    let client = reqwest::Client::new();
    let url = format!("{}/{MEMOS_API}/{}", base_url, id);
    let response = client.delete(url).send().await?;
    check_response(response, Some(id)).await?;
    Ok(())
}

pub async fn search_memos(base_url: &str, query: &str) -> Result<Vec<Memo>, MemoError> {
    let client = reqwest::Client::new();
    let url = format!("{}/{MEMOS_API}/search/", base_url);
    let response = client.get(url).query(&[("q", query)]).send().await?;
    let response = check_response(response, None).await?;
    Ok(response.json::<Vec<Memo>>().await?)
}
