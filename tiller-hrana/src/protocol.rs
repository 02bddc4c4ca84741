use serde::{Deserialize, Serialize};
use tiller_core::{Context, Envelope, Error, RemoteError, Result, WireValue};

/// Body of `POST /v2/pipeline`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PipelineRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baton: Option<&'a str>,
    pub requests: Vec<StreamRequest<'a>>,
}

impl<'a> PipelineRequest<'a> {
    /// Single statement pipeline, the stream is closed right after.
    pub fn execute(sql: &'a str) -> Self {
        Self {
            baton: None,
            requests: vec![
                StreamRequest::Execute {
                    stmt: Statement { sql },
                },
                StreamRequest::Close,
            ],
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamRequest<'a> {
    Execute { stmt: Statement<'a> },
    Close,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Statement<'a> {
    pub sql: &'a str,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PipelineResponse {
    #[serde(default)]
    pub baton: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub results: Vec<StreamResult>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamResult {
    Ok { response: StreamResponse },
    Error { error: ProtocolError },
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamResponse {
    Execute { result: StatementResult },
    Close,
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ProtocolError {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct StatementResult {
    #[serde(default)]
    pub cols: Vec<Column>,
    #[serde(default)]
    pub rows: Vec<Vec<Cell>>,
    #[serde(default)]
    pub affected_row_count: Option<u64>,
    #[serde(default)]
    pub last_insert_rowid: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Column {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub decltype: Option<String>,
}

/// Typed cell, blobs carry their payload in `base64` instead of `value`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Cell {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub base64: Option<String>,
}

impl From<Cell> for WireValue {
    fn from(cell: Cell) -> Self {
        match cell.base64 {
            Some(payload) if cell.value.is_null() => WireValue::new(cell.kind, payload),
            _ => WireValue::new(cell.kind, cell.value),
        }
    }
}

impl PipelineResponse {
    /// Outcome of the first request of the pipeline.
    pub fn into_envelope(self) -> Result<Envelope> {
        let Some(first) = self.results.into_iter().next() else {
            return Err(Error::msg("The pipeline response carries no result"));
        };
        let response = match first {
            StreamResult::Error { error } => {
                return Ok(Envelope {
                    error: Some(error.into()),
                    ..Default::default()
                });
            }
            StreamResult::Ok { response } => response,
        };
        let StreamResponse::Execute { result } = response else {
            return Err(Error::msg(
                "The first response of the pipeline is not the result of a statement",
            ));
        };
        let last_insert_id = result
            .last_insert_rowid
            .as_deref()
            .map(str::parse::<i64>)
            .transpose()
            .context("Invalid `last_insert_rowid`")?;
        Ok(Envelope {
            error: None,
            columns: result
                .cols
                .into_iter()
                .map(|c| c.name.unwrap_or_default())
                .collect(),
            rows: result
                .rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
            affected_row_count: result.affected_row_count,
            last_insert_id,
        })
    }
}

/// Parses the body returned by the pipeline endpoint.
pub fn parse_response(body: &str) -> Result<Envelope> {
    let response: PipelineResponse =
        serde_json::from_str(body).context("Could not parse the pipeline response")?;
    response.into_envelope()
}

impl From<ProtocolError> for RemoteError {
    fn from(error: ProtocolError) -> Self {
        RemoteError {
            code: error.code.unwrap_or_else(|| "UNKNOWN".into()),
            message: error.message,
        }
    }
}
