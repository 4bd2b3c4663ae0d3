use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the three source buffers a student edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "html")]
    Markup,
    #[serde(rename = "css")]
    Style,
    #[serde(rename = "javascript")]
    Script,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Markup, Language::Style, Language::Script];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Markup => "html",
            Language::Style => "css",
            Language::Script => "javascript",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Language::Markup => "HTML",
            Language::Style => "CSS",
            Language::Script => "JavaScript",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three buffers of a playground. Wire names follow the tabs the
/// students see: `html`, `css` and `javascript`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeState {
    #[serde(rename = "html", default)]
    pub markup: String,
    #[serde(rename = "css", default)]
    pub style: String,
    #[serde(rename = "javascript", default)]
    pub script: String,
}

impl CodeState {
    #[must_use]
    pub fn new(
        markup: impl Into<String>,
        style: impl Into<String>,
        script: impl Into<String>,
    ) -> Self {
        Self {
            markup: markup.into(),
            style: style.into(),
            script: script.into(),
        }
    }

    #[must_use]
    pub fn get(&self, language: Language) -> &str {
        match language {
            Language::Markup => &self.markup,
            Language::Style => &self.style,
            Language::Script => &self.script,
        }
    }

    pub fn set(&mut self, language: Language, text: String) {
        match language {
            Language::Markup => self.markup = text,
            Language::Style => self.style = text,
            Language::Script => self.script = text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub first_login: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A login session. Only the argon2 hash of the secret is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    #[serde(flatten)]
    pub code: CodeState,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectVersion {
    pub id: String,
    pub project_id: String,
    #[serde(flatten)]
    pub code: CodeState,
    pub created_at: DateTime<Utc>,
}

/// Partial update of a project. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub markup: Option<String>,
    pub style: Option<String>,
    pub script: Option<String>,
}

impl ProjectPatch {
    #[must_use]
    pub fn from_code(code: &CodeState) -> Self {
        Self {
            title: None,
            markup: Some(code.markup.clone()),
            style: Some(code.style.clone()),
            script: Some(code.script.clone()),
        }
    }

    fn apply(&self, project: &mut Project) {
        if let Some(title) = &self.title {
            project.title = title.clone();
        }
        if let Some(markup) = &self.markup {
            project.code.markup = markup.clone();
        }
        if let Some(style) = &self.style {
            project.code.style = style.clone();
        }
        if let Some(script) = &self.script {
            project.code.script = script.clone();
        }
    }

    /// Returns the project as it looks after this patch.
    #[must_use]
    pub fn applied_to(&self, mut project: Project) -> Project {
        self.apply(&mut project);
        project
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_state_wire_names() {
        let code = CodeState::new("<p>hi</p>", "p {}", "alert(1)");
        let json = serde_json::to_value(&code).unwrap();
        assert_eq!(json["html"], "<p>hi</p>");
        assert_eq!(json["css"], "p {}");
        assert_eq!(json["javascript"], "alert(1)");
    }

    #[test]
    fn test_language_wire_names() {
        assert_eq!(serde_json::to_value(Language::Markup).unwrap(), "html");
        assert_eq!(serde_json::to_value(Language::Style).unwrap(), "css");
        assert_eq!(serde_json::to_value(Language::Script).unwrap(), "javascript");
    }

    #[test]
    fn test_code_state_get_set() {
        let mut code = CodeState::default();
        code.set(Language::Script, "let a = 1;".to_string());
        assert_eq!(code.get(Language::Script), "let a = 1;");
        assert_eq!(code.get(Language::Markup), "");
    }

    #[test]
    fn test_project_flattens_code() {
        let now = Utc::now();
        let project = Project {
            id: "p1".to_string(),
            title: "Test".to_string(),
            code: CodeState::new("a", "b", "c"),
            owner_id: "u1".to_string(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&project).unwrap();
        assert_eq!(json["html"], "a");
        assert_eq!(json["javascript"], "c");
        assert!(json.get("code").is_none());
    }

    #[test]
    fn test_patch_leaves_missing_fields() {
        let now = Utc::now();
        let project = Project {
            id: "p1".to_string(),
            title: "Old".to_string(),
            code: CodeState::new("a", "b", "c"),
            owner_id: "u1".to_string(),
            created_at: now,
            updated_at: now,
        };
        let patch = ProjectPatch {
            script: Some("alert(1)".to_string()),
            ..Default::default()
        };
        let updated = patch.applied_to(project);
        assert_eq!(updated.title, "Old");
        assert_eq!(updated.code, CodeState::new("a", "b", "alert(1)"));
    }

    #[test]
    fn test_user_hash_not_serialized() {
        let now = Utc::now();
        let user = User {
            id: "u1".to_string(),
            username: "jan".to_string(),
            display_name: None,
            password_hash: "$argon2id$secret".to_string(),
            role: Role::Student,
            first_login: true,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
    }
}
