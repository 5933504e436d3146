// ============================================================================
// RBAC Core - Menu Entity
// File: crates/rbac-core/src/domain/menu.rs
// Description: Hierarchical menu node ordered by level code
// ============================================================================

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::status::RecordStatus;

/// Menu type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuType {
    System,
    Module,
    Function,
    /// Leaf whose `(path, method)` is an enforceable permission.
    Resource,
}

impl MenuType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MenuType::System => "system",
            MenuType::Module => "module",
            MenuType::Function => "function",
            MenuType::Resource => "resource",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "system" | "10" => Some(MenuType::System),
            "module" | "20" => Some(MenuType::Module),
            "function" | "30" => Some(MenuType::Function),
            "resource" | "40" => Some(MenuType::Resource),
            _ => None,
        }
    }

    pub fn code(&self) -> i16 {
        match self {
            MenuType::System => 10,
            MenuType::Module => 20,
            MenuType::Function => 30,
            MenuType::Resource => 40,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            10 => Some(MenuType::System),
            20 => Some(MenuType::Module),
            30 => Some(MenuType::Function),
            40 => Some(MenuType::Resource),
            _ => None,
        }
    }

    /// Types rendered as navigation entries (everything but resources).
    pub fn navigable() -> Vec<MenuType> {
        vec![MenuType::System, MenuType::Module, MenuType::Function]
    }
}

impl Default for MenuType {
    fn default() -> Self {
        MenuType::Function
    }
}

/// Menu entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Menu {
    pub id: Uuid,
    pub code: Option<String>,
    pub name: String,
    pub menu_type: MenuType,
    pub sequence: i32,
    pub icon: Option<String>,
    pub path: Option<String>,
    pub method: Option<String>,
    pub parent_id: Option<Uuid>,
    pub level_code: String,
    pub status: RecordStatus,

    // Audit fields
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<Uuid>,
    pub removed_at: Option<DateTime<Utc>>,
    pub removed_by: Option<Uuid>,
}

/// Client supplied menu fields for create and update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MenuInput {
    #[validate(length(min = 1, max = 50, message = "Code must be between 1 and 50 characters"))]
    pub code: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    pub name: String,

    #[serde(default)]
    pub menu_type: MenuType,

    #[serde(default)]
    pub sequence: i32,

    #[validate(length(max = 255, message = "Icon too long"))]
    pub icon: Option<String>,

    #[validate(length(max = 255, message = "Path too long"))]
    pub path: Option<String>,

    #[validate(length(min = 3, max = 10, message = "Invalid HTTP method"))]
    pub method: Option<String>,

    pub parent_id: Option<Uuid>,

    #[serde(default)]
    pub status: RecordStatus,
}

impl Menu {
    /// Create a new menu at an already allocated level code.
    pub fn new(
        input: MenuInput,
        level_code: String,
        created_by: Option<Uuid>,
    ) -> Result<Self, validator::ValidationErrors> {
        input.validate()?;

        let mut menu = Self {
            id: Uuid::new_v4(),
            code: None,
            name: String::new(),
            menu_type: MenuType::default(),
            sequence: 0,
            icon: None,
            path: None,
            method: None,
            parent_id: None,
            level_code,
            status: RecordStatus::Enabled,
            created_at: Utc::now(),
            created_by,
            modified_at: None,
            modified_by: None,
            removed_at: None,
            removed_by: None,
        };
        menu.assign(input);
        Ok(menu)
    }

    /// Overwrite the editable fields. `level_code` is left alone; it only
    /// changes through re-parenting.
    pub fn apply(
        &mut self,
        input: MenuInput,
        modified_by: Option<Uuid>,
    ) -> Result<(), validator::ValidationErrors> {
        input.validate()?;
        self.assign(input);
        self.modified_at = Some(Utc::now());
        self.modified_by = modified_by;
        Ok(())
    }

    fn assign(&mut self, input: MenuInput) {
        self.code = input.code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        self.name = input.name.trim().to_string();
        self.menu_type = input.menu_type;
        self.sequence = input.sequence;
        self.icon = input.icon;
        self.path = input.path.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
        self.method = input.method.map(|m| m.trim().to_uppercase()).filter(|m| !m.is_empty());
        self.parent_id = input.parent_id;
        self.status = input.status;
    }

    pub fn is_deleted(&self) -> bool {
        self.removed_at.is_some()
    }

    pub fn soft_delete(&mut self, removed_by: Option<Uuid>) {
        self.removed_at = Some(Utc::now());
        self.removed_by = removed_by;
    }

    /// `(path, METHOD)` granted by this menu, if it is a live resource.
    pub fn permission(&self) -> Option<(&str, &str)> {
        if self.menu_type != MenuType::Resource || !self.status.is_enabled() || self.is_deleted() {
            return None;
        }
        match (self.path.as_deref(), self.method.as_deref()) {
            (Some(path), Some(method)) => Some((path, method)),
            _ => None,
        }
    }
}

/// Filters for the paged menu listing.
#[derive(Debug, Clone, Default)]
pub struct MenuQuery {
    pub name: Option<String>,
    pub parent_id: Option<Uuid>,
    pub status: Option<RecordStatus>,
    pub menu_type: Option<MenuType>,
}

/// Filters for unpaged selection (tree rendering, policy loading).
#[derive(Debug, Clone, Default)]
pub struct MenuSelectQuery {
    pub name: Option<String>,
    pub status: Option<RecordStatus>,
    /// Empty means every type.
    pub types: Vec<MenuType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MenuTreeNode {
    #[serde(flatten)]
    pub menu: Menu,
    pub children: Vec<MenuTreeNode>,
}

/// Assemble a forest from a flat list. A node whose parent is absent from the
/// list becomes a root. Input order is kept among siblings.
pub fn build_tree(menus: Vec<Menu>) -> Vec<MenuTreeNode> {
    let ids: HashSet<Uuid> = menus.iter().map(|m| m.id).collect();
    let mut children: HashMap<Uuid, Vec<Menu>> = HashMap::new();
    let mut roots = Vec::new();

    for menu in menus {
        match menu.parent_id.filter(|p| ids.contains(p)) {
            Some(parent) => children.entry(parent).or_default().push(menu),
            None => roots.push(menu),
        }
    }

    roots
        .into_iter()
        .map(|menu| attach_children(menu, &mut children))
        .collect()
}

fn attach_children(menu: Menu, children: &mut HashMap<Uuid, Vec<Menu>>) -> MenuTreeNode {
    let kids = children.remove(&menu.id).unwrap_or_default();
    MenuTreeNode {
        children: kids
            .into_iter()
            .map(|child| attach_children(child, children))
            .collect(),
        menu,
    }
}
