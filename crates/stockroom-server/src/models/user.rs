use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use stockroom_api::{ApiResult, PageParams, Validator};
use stockroom_auth::Role;
use stockroom_storage::{Filter, SortSpec};

use super::product::non_blank;

pub const USERS: &str = "users";

const GENDERS: &[&str] = &["male", "female", "other"];

/// A user as stored. Only the repository sees this type; `password` holds
/// the Argon2 PHC string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl UserRecord {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }

    pub fn details(&self) -> UserDetails {
        UserDetails {
            base: self.summary(),
            gender: self.gender.clone(),
            age: self.age,
            address: self.address.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// Public view used in listings, login and role assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Public detail view: the summary plus profile fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    #[serde(flatten)]
    pub base: UserSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Signup payload. There is no role field: new accounts are always `user`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub gender: Option<String>,
    pub age: Option<i64>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

impl CreateUserRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let mut v = Validator::new();
        if v.required("name", self.name.as_deref()) {
            v.length("name", self.name.as_deref().unwrap_or_default().trim(), 2, 50);
        }
        if v.required("email", self.email.as_deref()) {
            v.email("email", self.email.as_deref().unwrap_or_default().trim());
        }
        if v.required("password", self.password.as_deref()) {
            v.min_length("password", self.password.as_deref().unwrap_or_default(), 6);
        }
        validate_profile(
            &mut v,
            non_blank(&self.gender),
            self.age,
            non_blank(&self.phone),
        );
        v.finish()
    }

    pub fn normalized_email(&self) -> String {
        normalize_email(self.email.as_deref().unwrap_or_default())
    }

    /// Builds the stored record. Call after [`validate`](Self::validate).
    pub fn into_record(self, id: String, password_hash: String) -> UserRecord {
        let email = self.normalized_email();
        UserRecord {
            id,
            name: self.name.unwrap_or_default().trim().to_string(),
            email,
            password: password_hash,
            role: Role::User,
            gender: non_blank(&self.gender).map(str::to_string),
            age: self.age.and_then(|a| u32::try_from(a).ok()),
            address: non_blank(&self.address).map(|s| s.trim().to_string()),
            phone: non_blank(&self.phone).map(str::to_string),
        }
    }
}

/// Partial update; omitted and blank text fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub gender: Option<String>,
    pub age: Option<i64>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let mut v = Validator::new();
        if let Some(name) = non_blank(&self.name) {
            v.length("name", name.trim(), 2, 100);
        }
        if let Some(email) = non_blank(&self.email) {
            v.email("email", email.trim());
        }
        if let Some(password) = non_blank(&self.password) {
            v.min_length("password", password, 6);
        }
        validate_profile(
            &mut v,
            non_blank(&self.gender),
            self.age,
            non_blank(&self.phone),
        );
        v.finish()
    }

    pub fn normalized_email(&self) -> Option<String> {
        non_blank(&self.email).map(normalize_email)
    }

    pub fn new_password(&self) -> Option<&str> {
        non_blank(&self.password)
    }

    /// Fields to write, with `password_hash` standing in for the plain
    /// password. Empty when the request changes nothing.
    pub fn changes(&self, password_hash: Option<String>) -> Map<String, Value> {
        let mut changes = Map::new();
        if let Some(name) = non_blank(&self.name) {
            changes.insert("name".into(), name.trim().into());
        }
        if let Some(email) = self.normalized_email() {
            changes.insert("email".into(), email.into());
        }
        if let Some(hash) = password_hash {
            changes.insert("password".into(), hash.into());
        }
        if let Some(gender) = non_blank(&self.gender) {
            changes.insert("gender".into(), gender.into());
        }
        if let Some(age) = self.age {
            changes.insert("age".into(), age.into());
        }
        if let Some(address) = non_blank(&self.address) {
            changes.insert("address".into(), address.trim().into());
        }
        if let Some(phone) = non_blank(&self.phone) {
            changes.insert("phone".into(), phone.into());
        }
        changes
    }
}

fn validate_profile(v: &mut Validator, gender: Option<&str>, age: Option<i64>, phone: Option<&str>) {
    if let Some(gender) = gender {
        v.one_of("gender", gender, GENDERS);
    }
    if let Some(age) = age {
        v.at_least("age", age, 0);
        v.at_most("age", age, 150);
    }
    if let Some(phone) = phone {
        v.phone("phone", phone);
    }
}

/// Emails are compared trimmed and lowercased.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let mut v = Validator::new();
        if v.required("email", self.email.as_deref()) {
            v.email("email", self.email.as_deref().unwrap_or_default().trim());
        }
        v.required("password", self.password.as_deref());
        v.finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignRoleRequest {
    pub user_id: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserSort {
    #[default]
    NameAsc,
    NameDesc,
    EmailAsc,
    EmailDesc,
}

impl UserSort {
    /// Unknown or missing names fall back to name ascending.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("name_desc") => Self::NameDesc,
            Some("email_asc") => Self::EmailAsc,
            Some("email_desc") => Self::EmailDesc,
            _ => Self::NameAsc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NameAsc => "name_asc",
            Self::NameDesc => "name_desc",
            Self::EmailAsc => "email_asc",
            Self::EmailDesc => "email_desc",
        }
    }

    pub fn spec(self) -> SortSpec {
        match self {
            Self::NameAsc => SortSpec::ascending("name"),
            Self::NameDesc => SortSpec::descending("name"),
            Self::EmailAsc => SortSpec::ascending("email"),
            Self::EmailDesc => SortSpec::descending("email"),
        }
    }
}

/// Raw query string of `GET /users`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub role: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQuery {
    pub page: PageParams,
    pub role: Option<Role>,
    pub search: Option<String>,
    pub sort: UserSort,
}

impl TryFrom<UserListParams> for UserQuery {
    type Error = stockroom_api::ApiError;

    /// A role filter that names no known role is a validation error.
    fn try_from(params: UserListParams) -> Result<Self, Self::Error> {
        let role = match non_blank(&params.role) {
            Some(raw) => {
                let mut v = Validator::new();
                v.one_of("role", raw.trim(), &Role::names());
                v.finish()?;
                raw.trim().parse().ok()
            }
            None => None,
        };
        Ok(Self {
            page: PageParams::from_query(params.page.as_deref(), params.limit.as_deref()),
            role,
            search: non_blank(&params.search).map(|s| s.trim().to_string()),
            sort: UserSort::parse(params.sort.as_deref()),
        })
    }
}

impl UserQuery {
    pub fn filter(&self) -> Filter {
        let mut filter = Filter::All;
        if let Some(role) = self.role {
            filter = filter.and(Filter::eq("role", role.as_str()));
        }
        if let Some(search) = &self.search {
            filter = filter.and(Filter::search(&["name", "email"], search));
        }
        filter
    }
}
