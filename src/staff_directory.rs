use crate::types::Staff;

pub const MAX_STAFF_ENTRIES: usize = 5;
pub const FALLBACK_STAFF_ID: &str = "general";

/// A staff member as it appears in the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaffEntry {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl StaffEntry {
    /// Reads `STAFF_1_*` through `STAFF_5_*` via `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Vec<StaffEntry>
    where
        F: Fn(&str) -> Option<String>,
    {
        (1..=MAX_STAFF_ENTRIES)
            .map(|index| StaffEntry {
                id: lookup(&format!("STAFF_{index}_ID")),
                name: lookup(&format!("STAFF_{index}_NAME")),
                email: lookup(&format!("STAFF_{index}_EMAIL")),
            })
            .collect()
    }

    fn into_staff(self) -> Option<Staff> {
        let name = self.name.filter(|name| !name.trim().is_empty())?;
        let email = self.email.filter(|email| !email.trim().is_empty())?;
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| name.to_lowercase().replace(' ', "_"));
        Some(Staff { id, name, email })
    }
}

#[derive(Debug, Clone)]
pub struct StaffDirectory {
    staff: Vec<Staff>,
}

impl StaffDirectory {
    pub fn new(entries: Vec<StaffEntry>, fallback_name: &str, fallback_inbox: &str) -> Self {
        let mut staff: Vec<Staff> = entries
            .into_iter()
            .filter_map(StaffEntry::into_staff)
            .collect();

        if staff.is_empty() {
            staff.push(Staff {
                id: FALLBACK_STAFF_ID.to_string(),
                name: fallback_name.to_string(),
                email: fallback_inbox.to_string(),
            });
        }

        Self { staff }
    }

    pub fn list_staff(&self) -> &[Staff] {
        &self.staff
    }

    pub fn find(&self, staff_id: &str) -> Option<&Staff> {
        self.staff.iter().find(|staff| staff.id == staff_id)
    }
}
