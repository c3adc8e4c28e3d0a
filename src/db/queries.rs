//! SQL query constants and builders
//!
//! Contains all SQL queries used by the application.

use super::CatalogKind;

/// Bootstrap DDL, idempotent. The hosted migration stays authoritative.
pub const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS properties (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        price DOUBLE PRECISION NOT NULL,
        location TEXT NOT NULL,
        region TEXT NOT NULL,
        type TEXT NOT NULL,
        status TEXT NOT NULL,
        dubai_status TEXT,
        image_ids TEXT[] NOT NULL DEFAULT '{}',
        bedrooms INTEGER NOT NULL DEFAULT 0,
        bathrooms INTEGER NOT NULL DEFAULT 0,
        area DOUBLE PRECISION NOT NULL,
        created_at TIMESTAMPTZ DEFAULT NOW()
    )"#,
    r#"
    CREATE TABLE IF NOT EXISTS inquiries (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        property_id TEXT,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        phone TEXT NOT NULL,
        message TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"
    CREATE TABLE IF NOT EXISTS valuations (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        phone TEXT NOT NULL,
        message TEXT NOT NULL,
        address TEXT,
        type TEXT,
        expected_value DOUBLE PRECISION,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"
    CREATE TABLE IF NOT EXISTS consultations (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        phone TEXT NOT NULL,
        budget TEXT,
        message TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"
    CREATE TABLE IF NOT EXISTS admin_users (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        email TEXT UNIQUE NOT NULL,
        password TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"
    CREATE TABLE IF NOT EXISTS property_types (
        id SERIAL PRIMARY KEY,
        name TEXT UNIQUE NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT true,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"
    CREATE TABLE IF NOT EXISTS listing_statuses (
        id SERIAL PRIMARY KEY,
        name TEXT UNIQUE NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT true,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"
    CREATE TABLE IF NOT EXISTS smtp_settings (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        host TEXT NOT NULL,
        port INTEGER NOT NULL,
        secure BOOLEAN NOT NULL DEFAULT false,
        username TEXT NOT NULL,
        password TEXT NOT NULL,
        from_email TEXT NOT NULL,
        from_name TEXT NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT true,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_properties_created_at ON properties(created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_inquiries_property_id ON inquiries(property_id)",
];

const PROPERTY_COLUMNS: &str = "id, title, description, price, location, region, type, status, \
     dubai_status, image_ids, bedrooms, bathrooms, area, created_at";

pub const PING: &str = "SELECT 1";

pub fn list_properties() -> String {
    format!(
        "SELECT {} FROM properties ORDER BY created_at DESC NULLS LAST",
        PROPERTY_COLUMNS
    )
}

/// `$1` is an ILIKE pattern built by [`like_pattern`]
pub fn search_properties() -> String {
    format!(
        "SELECT {} FROM properties WHERE location ILIKE $1 OR region ILIKE $1 \
         ORDER BY created_at DESC NULLS LAST",
        PROPERTY_COLUMNS
    )
}

pub fn featured_properties() -> String {
    format!(
        "SELECT {} FROM properties ORDER BY created_at DESC NULLS LAST LIMIT $1",
        PROPERTY_COLUMNS
    )
}

pub fn get_property() -> String {
    format!("SELECT {} FROM properties WHERE id = $1", PROPERTY_COLUMNS)
}

pub fn insert_property() -> String {
    format!(
        "INSERT INTO properties (title, description, price, location, region, type, status, \
         dubai_status, image_ids, bedrooms, bathrooms, area) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         RETURNING {}",
        PROPERTY_COLUMNS
    )
}

pub fn update_property() -> String {
    format!(
        "UPDATE properties SET title = $1, description = $2, price = $3, location = $4, \
         region = $5, type = $6, status = $7, dubai_status = $8, image_ids = $9, \
         bedrooms = $10, bathrooms = $11, area = $12 \
         WHERE id = $13 RETURNING {}",
        PROPERTY_COLUMNS
    )
}

pub const DELETE_PROPERTY: &str = "DELETE FROM properties WHERE id = $1";

pub const LIST_LOCATIONS: &str =
    "SELECT DISTINCT location FROM properties ORDER BY location";

pub const INSERT_INQUIRY: &str = r#"
    INSERT INTO inquiries (property_id, name, email, phone, message)
    VALUES ($1, $2, $3, $4, $5)
    RETURNING id, property_id, name, email, phone, message, created_at
"#;

pub const LIST_INQUIRIES: &str = r#"
    SELECT id, property_id, name, email, phone, message, created_at
    FROM inquiries ORDER BY created_at DESC
"#;

pub const INSERT_VALUATION: &str = r#"
    INSERT INTO valuations (name, email, phone, message)
    VALUES ($1, $2, $3, $4)
    RETURNING id, name, email, phone, message, address, type, expected_value, created_at
"#;

pub const LIST_VALUATIONS: &str = r#"
    SELECT id, name, email, phone, message, address, type, expected_value, created_at
    FROM valuations ORDER BY created_at DESC
"#;

pub const INSERT_CONSULTATION: &str = r#"
    INSERT INTO consultations (name, email, phone, budget, message)
    VALUES ($1, $2, $3, $4, $5)
    RETURNING id, name, email, phone, budget, message, created_at
"#;

pub const LIST_CONSULTATIONS: &str = r#"
    SELECT id, name, email, phone, budget, message, created_at
    FROM consultations ORDER BY created_at DESC
"#;

pub const DASHBOARD_STATS: &str = r#"
    SELECT
        (SELECT COUNT(*) FROM properties) AS total_properties,
        (SELECT COUNT(*) FROM inquiries) AS inquiries,
        (SELECT COUNT(*) FROM valuations) AS valuations,
        (SELECT COUNT(*) FROM consultations) AS consultations
"#;

pub fn list_catalog(kind: CatalogKind) -> &'static str {
    match kind {
        CatalogKind::PropertyType => {
            "SELECT name FROM property_types WHERE is_active = true ORDER BY name"
        }
        CatalogKind::ListingStatus => {
            "SELECT name FROM listing_statuses WHERE is_active = true ORDER BY name"
        }
    }
}

pub fn add_catalog_entry(kind: CatalogKind) -> &'static str {
    match kind {
        CatalogKind::PropertyType => {
            "INSERT INTO property_types (name) VALUES ($1) \
             ON CONFLICT (name) DO UPDATE SET is_active = true \
             RETURNING name, is_active"
        }
        CatalogKind::ListingStatus => {
            "INSERT INTO listing_statuses (name) VALUES ($1) \
             ON CONFLICT (name) DO UPDATE SET is_active = true \
             RETURNING name, is_active"
        }
    }
}

pub fn deactivate_catalog_entry(kind: CatalogKind) -> &'static str {
    match kind {
        CatalogKind::PropertyType => {
            "UPDATE property_types SET is_active = false WHERE name = $1 AND is_active = true"
        }
        CatalogKind::ListingStatus => {
            "UPDATE listing_statuses SET is_active = false WHERE name = $1 AND is_active = true"
        }
    }
}

pub const FIND_ADMIN_BY_EMAIL: &str =
    "SELECT id, email, password, created_at FROM admin_users WHERE email = $1";

pub const INSERT_ADMIN: &str = r#"
    INSERT INTO admin_users (email, password) VALUES ($1, $2)
    RETURNING id, email, password, created_at
"#;

const SMTP_COLUMNS: &str =
    "id, host, port, secure, username, password, from_email, from_name, is_active, created_at";

pub fn active_smtp_settings() -> String {
    format!(
        "SELECT {} FROM smtp_settings WHERE is_active = true \
         ORDER BY created_at DESC LIMIT 1",
        SMTP_COLUMNS
    )
}

/// Single statement: retire the active rows and insert the replacement
pub fn save_smtp_settings() -> String {
    format!(
        "WITH retired AS (UPDATE smtp_settings SET is_active = false WHERE is_active = true) \
         INSERT INTO smtp_settings (host, port, secure, username, password, from_email, from_name, is_active) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, true) \
         RETURNING {}",
        SMTP_COLUMNS
    )
}

/// Build a case-insensitive substring pattern, escaping LIKE wildcards
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Marina"), "%Marina%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_catalog_queries_target_their_table() {
        assert!(list_catalog(CatalogKind::PropertyType).contains("property_types"));
        assert!(add_catalog_entry(CatalogKind::ListingStatus).contains("listing_statuses"));
        assert!(deactivate_catalog_entry(CatalogKind::ListingStatus).contains("is_active = false"));
    }

    #[test]
    fn test_update_binds_id_last() {
        assert!(update_property().contains("WHERE id = $13"));
    }
}
