//! Permission Definitions
//!
//! ## 设计原则
//! - 登录即可读取表单结构和回执模板
//! - 按操作授权：入库、出库、查看、删除
//! - 管理类权限单独授予（表单、模板、用户、CRM 同步）

/// Take orders into storage, create and import records
pub const STORE: &str = "store";
/// Release records, release-desk search
pub const RELEASE: &str = "release";
/// List, view and export records
pub const VIEW: &str = "view";
/// Bulk delete
pub const DELETE_RECORDS: &str = "delete_records";
/// Edit the form schema
pub const FORM_MANAGEMENT: &str = "form_management";
/// Edit the receipt template
pub const PDF_MANAGEMENT: &str = "pdf_management";
/// Manage user accounts
pub const USER_MANAGEMENT: &str = "user_management";
/// Trigger CRM sync, retry status pushes
pub const CRM_SYNC: &str = "crm_sync";

/// 可配置权限列表
pub const ALL_PERMISSIONS: &[&str] = &[
    STORE,
    RELEASE,
    VIEW,
    DELETE_RECORDS,
    FORM_MANAGEMENT,
    PDF_MANAGEMENT,
    USER_MANAGEMENT,
    CRM_SYNC,
];

/// 超级权限
pub const ALL: &str = "all";

/// Default role permissions
pub const DEFAULT_ADMIN_PERMISSIONS: &[&str] = &[ALL];

/// 普通员工默认权限
pub const DEFAULT_USER_PERMISSIONS: &[&str] = &[STORE, VIEW];

/// Get permissions for a role name
pub fn get_default_permissions(role_name: &str) -> Vec<String> {
    let permissions = match role_name {
        "admin" => DEFAULT_ADMIN_PERMISSIONS,
        "user" => DEFAULT_USER_PERMISSIONS,
        _ => &[],
    };
    permissions.iter().map(|s| s.to_string()).collect()
}

/// Validate if a permission string is valid
pub fn is_valid_permission(permission: &str) -> bool {
    ALL_PERMISSIONS.contains(&permission) || permission == ALL || permission.ends_with(":*")
}

/// Does the permission set grant `permission`?
///
/// `"all"` grants everything; `"prefix:*"` grants `"prefix:anything"`.
pub fn has(granted: &[String], permission: &str) -> bool {
    granted.iter().any(|p| {
        if p == ALL || p == permission {
            return true;
        }
        p.strip_suffix(":*")
            .is_some_and(|prefix| permission.starts_with(&format!("{}:", prefix)))
    })
}
