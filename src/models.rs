use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the remote folder that aggregates every other folder.
pub const ALL_FOLDER: &str = "All";

/// A release instance in the collection, tagged with the folder it was fetched from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    #[serde(default)]
    pub instance_id: u64,
    #[serde(default)]
    pub folder_id: u64,
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub basic_information: BasicInformation,
    #[serde(default)]
    pub notes: Vec<Note>,
    /// Assigned by the client at fetch time, absent from the remote payload.
    #[serde(rename = "FolderName", default)]
    pub folder_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicInformation {
    pub id: u64,
    pub title: String,
    pub year: u32,
    pub resource_url: String,
    pub thumb: String,
    pub cover_image: String,
    pub formats: Vec<Format>,
    pub labels: Vec<Label>,
    pub artists: Vec<Artist>,
    pub genres: Vec<String>,
    pub styles: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Format {
    pub qty: String,
    pub descriptions: Vec<String>,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Label {
    pub resource_url: String,
    pub entity_type: String,
    pub catno: String,
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Artist {
    pub id: u64,
    pub name: String,
    pub join: String,
    pub resource_url: String,
    pub anv: String,
    pub tracks: String,
    pub role: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Note {
    pub field_id: u64,
    pub value: String,
}

/// A named sub-collection on the remote side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub resource_url: String,
}

impl Folder {
    pub fn is_all(&self) -> bool {
        self.name == ALL_FOLDER
    }
}

/// Token and the username it resolves to. Built once per run.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub token: String,
    pub username: String,
}

// Keep the token out of debug logs.
impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("token", &"<redacted>")
            .field("username", &self.username)
            .finish()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = &self.basic_information;
        let artists = info
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let formats = info
            .formats
            .iter()
            .map(|fmt| fmt.name.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        writeln!(f, "Record ID: {}", self.id)?;
        writeln!(f, "Title: {}", info.title)?;
        if !artists.is_empty() {
            writeln!(f, "Artists: {}", artists)?;
        }
        writeln!(f, "Year: {}", info.year)?;
        writeln!(f, "Format: {}", formats)?;
        writeln!(f, "Resource URL: {}", info.resource_url)?;
        write!(f, "Folder Name: {}", self.folder_name)
    }
}
