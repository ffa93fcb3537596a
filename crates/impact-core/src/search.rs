//! Client-side search over fetched lists
//!
//! A query matches a record when any of the record's searchable fields
//! contains it, ignoring case. Blank queries match everything. There is no
//! index; lists here are at most a few thousand rows.

use crate::types::{Employee, Organization, OrganizationStat, UserAccount};

/// Records with a default set of searchable fields
pub trait Searchable {
    /// Fields consulted by [`filter_records`]; `None` for absent values
    fn search_fields(&self) -> Vec<Option<&str>>;
}

/// Whether `needle` (already lowercased) occurs in any present field
fn any_field_matches<'a, I>(fields: I, needle: &str) -> bool
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    fields
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Filter `records` by `query` over the fields chosen by `fields`
///
/// The emptiness check trims the query but matching does not, so a query of
/// `"ann "` only matches values containing the trailing space.
pub fn filter_by<'a, T, F, I>(records: &'a [T], query: &str, fields: F) -> Vec<&'a T>
where
    F: Fn(&'a T) -> I,
    I: IntoIterator<Item = Option<&'a str>>,
{
    if query.trim().is_empty() {
        return records.iter().collect();
    }

    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|record| any_field_matches(fields(*record), &needle))
        .collect()
}

/// Filter records using their [`Searchable`] field set
pub fn filter_records<'a, T: Searchable>(records: &'a [T], query: &str) -> Vec<&'a T> {
    filter_by(records, query, T::search_fields)
}

/// Filter arbitrary JSON rows by top-level string fields
pub fn filter_json<'a>(
    records: &'a [serde_json::Value],
    query: &str,
    keys: &'a [&'a str],
) -> Vec<&'a serde_json::Value> {
    filter_by(records, query, move |row| {
        keys.iter().map(move |key| row.get(*key).and_then(serde_json::Value::as_str))
    })
}

impl Searchable for UserAccount {
    fn search_fields(&self) -> Vec<Option<&str>> {
        vec![
            Some(self.username.as_str()),
            self.email.as_deref(),
            self.role.as_deref(),
            self.designation.as_deref(),
            self.organization.as_ref().map(|org| org.name.as_str()),
        ]
    }
}

impl Searchable for Employee {
    fn search_fields(&self) -> Vec<Option<&str>> {
        vec![
            Some(self.name.as_str()),
            self.email.as_deref(),
            self.designation.as_deref(),
        ]
    }
}

impl Searchable for OrganizationStat {
    fn search_fields(&self) -> Vec<Option<&str>> {
        vec![Some(self.org_name.as_str()), Some(self.status.as_str())]
    }
}

impl Searchable for Organization {
    fn search_fields(&self) -> Vec<Option<&str>> {
        vec![
            Some(self.name.as_str()),
            self.domain.as_deref(),
            self.status.map(crate::types::OrgStatus::as_str),
        ]
    }
}

/// All-users list: username, email, role, designation, organization
pub fn filter_users<'a>(users: &'a [UserAccount], query: &str) -> Vec<&'a UserAccount> {
    filter_records(users, query)
}

/// Portal admin list: same as users minus the role, which is uniform
pub fn filter_portal_admins<'a>(admins: &'a [UserAccount], query: &str) -> Vec<&'a UserAccount> {
    filter_by(admins, query, |admin| {
        [
            Some(admin.username.as_str()),
            admin.email.as_deref(),
            admin.designation.as_deref(),
            admin.organization.as_ref().map(|org| org.name.as_str()),
        ]
    })
}

/// Organization statistics: name and status
pub fn filter_org_stats<'a>(stats: &'a [OrganizationStat], query: &str) -> Vec<&'a OrganizationStat> {
    filter_records(stats, query)
}

/// Organization list: name, domain, status
pub fn filter_organizations<'a>(orgs: &'a [Organization], query: &str) -> Vec<&'a Organization> {
    filter_records(orgs, query)
}

/// Employee list: name, email, designation
pub fn filter_employees<'a>(employees: &'a [Employee], query: &str) -> Vec<&'a Employee> {
    filter_records(employees, query)
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::OrganizationRef;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn user(username: &str, org: Option<&str>, role: &str) -> UserAccount {
        UserAccount {
            id: 1,
            username: username.to_string(),
            email: Some(format!("{username}@example.com")),
            role: Some(role.to_string()),
            designation: None,
            organization: org.map(|name| OrganizationRef {
                name: name.to_string(),
                ..OrganizationRef::default()
            }),
            created_at: None,
        }
    }

    fn stat(name: &str, status: &str) -> OrganizationStat {
        OrganizationStat {
            org_name: name.to_string(),
            status: status.to_string(),
            ..OrganizationStat::default()
        }
    }

    #[test]
    fn test_blank_query_returns_everything_in_order() {
        let stats = vec![stat("Zeta", "active"), stat("Alpha", "inactive")];

        for query in ["", "   ", "\t"] {
            let names: Vec<_> = filter_org_stats(&stats, query)
                .iter()
                .map(|s| s.org_name.as_str())
                .collect();
            assert_eq!(names, vec!["Zeta", "Alpha"]);
        }
    }

    #[test]
    fn test_case_insensitive_match() {
        let stats = vec![stat("Acme Corp", "active"), stat("Other", "active")];
        let hits = filter_org_stats(&stats, "ACME");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].org_name, "Acme Corp");
    }

    #[test]
    fn test_status_is_searchable() {
        let stats = vec![stat("Acme", "active"), stat("Globex", "suspended")];
        let hits = filter_org_stats(&stats, "susp");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].org_name, "Globex");
    }

    #[test]
    fn test_users_match_organization_name_and_skip_missing_fields() {
        let users = vec![
            user("alice", Some("Initech"), "employee"),
            user("bob", None, "admin"),
        ];

        let hits = filter_users(&users, "initech");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].username, "alice");
    }

    #[test]
    fn test_portal_admin_filter_ignores_role() {
        let admins = vec![user("carol", Some("Acme"), "portal_admin")];
        assert!(filter_portal_admins(&admins, "portal").is_empty());
        assert_eq!(filter_users(&admins, "portal").len(), 1);
    }

    #[test]
    fn test_query_is_not_trimmed_for_matching() {
        let users = vec![user("dan", None, "employee")];
        assert!(filter_users(&users, " dan").is_empty());
        assert_eq!(filter_users(&users, "dan").len(), 1);
    }

    #[test]
    fn test_employees_search_designation() {
        let employees = vec![
            Employee {
                id: 1,
                name: "erin".to_string(),
                email: None,
                designation: Some("Security Analyst".to_string()),
            },
            Employee {
                id: 2,
                name: "frank".to_string(),
                email: None,
                designation: None,
            },
        ];

        let hits = filter_employees(&employees, "analyst");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "erin");
    }

    #[test]
    fn test_filter_json_rows() {
        let rows = vec![
            serde_json::json!({"title": "Phishing Basics", "enrolled_count": 4}),
            serde_json::json!({"title": "Password Hygiene", "enrolled_count": 2}),
        ];
        let hits = filter_json(&rows, "phish", &["title"]);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_organization_filter_fields() {
        let orgs = vec![Organization {
            id: 4,
            name: "Acme".to_string(),
            domain: Some("acme.com".to_string()),
            status: Some(crate::types::OrgStatus::Active),
            portal_admin: Some("carol".to_string()),
            created: None,
            courses: Vec::new(),
        }];

        assert_eq!(filter_organizations(&orgs, "ACME.COM").len(), 1);
        assert_eq!(filter_organizations(&orgs, "active").len(), 1);
        assert!(filter_organizations(&orgs, "carol").is_empty());
    }

    proptest! {
        #[test]
        fn prop_results_are_an_ordered_subset(names in proptest::collection::vec("[a-zA-Z ]{0,12}", 0..20), query in "[a-zA-Z ]{0,4}") {
            let stats: Vec<_> = names.iter().map(|n| stat(n, "active")).collect();
            let hits = filter_org_stats(&stats, &query);

            prop_assert!(hits.len() <= stats.len());
            let mut cursor = 0;
            for hit in hits {
                let pos = stats[cursor..].iter().position(|s| std::ptr::eq(s, hit));
                prop_assert!(pos.is_some());
                cursor += pos.unwrap() + 1;
            }
        }
    }
}
