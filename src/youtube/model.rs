use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct YoutubePageResponse<T> {
    #[serde(default)]
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct YoutubePlaylistResponse {
    pub id: String,
    pub snippet: YoutubePlaylistSnippet,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct YoutubePlaylistSnippet {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct YoutubePlaylistStatus {
    pub privacy_status: &'static str,
}

#[derive(Serialize, Debug)]
pub struct YoutubePlaylistInsert {
    pub snippet: YoutubePlaylistSnippet,
    pub status: YoutubePlaylistStatus,
}

#[derive(Deserialize, Debug)]
pub struct YoutubePlaylistItemResponse {
    pub snippet: YoutubePlaylistItemSnippetResponse,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct YoutubePlaylistItemSnippetResponse {
    pub resource_id: YoutubeResourceIdResponse,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct YoutubeResourceIdResponse {
    pub kind: Option<String>,
    pub video_id: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct YoutubeResourceId<'a> {
    pub kind: &'static str,
    pub video_id: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct YoutubePlaylistItemSnippet<'a> {
    pub playlist_id: &'a str,
    pub resource_id: YoutubeResourceId<'a>,
}

#[derive(Serialize, Debug)]
pub struct YoutubePlaylistItemInsert<'a> {
    pub snippet: YoutubePlaylistItemSnippet<'a>,
}

#[derive(Deserialize, Debug)]
pub struct YoutubeErrorResponse {
    pub error: YoutubeErrorBody,
}

#[derive(Deserialize, Debug)]
pub struct YoutubeErrorBody {
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<YoutubeErrorDetail>,
}

#[derive(Deserialize, Debug)]
pub struct YoutubeErrorDetail {
    pub reason: Option<String>,
}
