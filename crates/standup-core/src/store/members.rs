use chrono::Utc;
use redb::ReadableTable;

use super::{db_err, decode, encode, RosterSource, Store, MEMBERS};
use crate::error::{Result, StandupError};
use crate::paths::validate_member_id;
use crate::types::Member;

impl Store {
    /// Insert or replace a member. `created_at` is preserved on update.
    pub fn upsert_member(&self, mut member: Member) -> Result<Member> {
        validate_member_id(&member.id)?;
        let wt = self.db().begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(MEMBERS).map_err(db_err)?;
            let existing: Option<Member> = match table.get(member.id.as_str()).map_err(db_err)? {
                Some(v) => Some(decode(v.value())?),
                None => None,
            };
            if let Some(prev) = existing {
                member.created_at = prev.created_at;
            }
            member.updated_at = Utc::now();
            let value = encode(&member)?;
            table
                .insert(member.id.as_str(), value.as_slice())
                .map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(member)
    }

    pub fn get_member(&self, id: &str) -> Result<Option<Member>> {
        let rt = self.db().begin_read().map_err(db_err)?;
        let table = rt.open_table(MEMBERS).map_err(db_err)?;
        match table.get(id).map_err(db_err)? {
            Some(v) => Ok(Some(decode(v.value())?)),
            None => Ok(None),
        }
    }

    /// All members, active or not, ordered by id.
    pub fn list_members(&self) -> Result<Vec<Member>> {
        let rt = self.db().begin_read().map_err(db_err)?;
        let table = rt.open_table(MEMBERS).map_err(db_err)?;
        let mut result = Vec::new();
        for entry in table.iter().map_err(db_err)? {
            let (_, v) = entry.map_err(db_err)?;
            result.push(decode::<Member>(v.value())?);
        }
        Ok(result)
    }

    /// Flip a member's active flag. Members are never deleted.
    pub fn set_member_active(&self, id: &str, active: bool) -> Result<Member> {
        let wt = self.db().begin_write().map_err(db_err)?;
        let member = {
            let mut table = wt.open_table(MEMBERS).map_err(db_err)?;
            let mut member: Member = match table.get(id).map_err(db_err)? {
                Some(v) => decode(v.value())?,
                None => return Err(StandupError::MemberNotFound(id.to_string())),
            };
            member.active = active;
            member.updated_at = Utc::now();
            let value = encode(&member)?;
            table.insert(id, value.as_slice()).map_err(db_err)?;
            member
        };
        wt.commit().map_err(db_err)?;
        Ok(member)
    }
}

impl RosterSource for Store {
    fn active_members(&self) -> Result<Vec<Member>> {
        Ok(self
            .list_members()?
            .into_iter()
            .filter(|m| m.active)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::open_tmp;

    #[test]
    fn upsert_keeps_created_at() {
        let (_dir, store) = open_tmp();
        let first = store.upsert_member(Member::new("alice", "Alice", "U1")).unwrap();
        let mut renamed = Member::new("alice", "Alice Smith", "U1");
        renamed.created_at = chrono::Utc::now() + chrono::Duration::days(1);
        let second = store.upsert_member(renamed).unwrap();
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(store.get_member("alice").unwrap().unwrap().name, "Alice Smith");
    }

    #[test]
    fn upsert_rejects_bad_id() {
        let (_dir, store) = open_tmp();
        let err = store.upsert_member(Member::new("a/b", "Bad", "U1")).unwrap_err();
        assert!(matches!(err, StandupError::InvalidMemberId(_)));
    }

    #[test]
    fn deactivated_members_leave_roster_but_stay_stored() {
        let (_dir, store) = open_tmp();
        store.upsert_member(Member::new("alice", "Alice", "U1")).unwrap();
        store.upsert_member(Member::new("bob", "Bob", "U2")).unwrap();
        store.set_member_active("bob", false).unwrap();

        let active = store.active_members().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "alice");
        assert_eq!(store.list_members().unwrap().len(), 2);
    }

    #[test]
    fn set_active_on_unknown_member_is_not_found() {
        let (_dir, store) = open_tmp();
        let err = store.set_member_active("ghost", false).unwrap_err();
        assert!(matches!(err, StandupError::MemberNotFound(_)));
    }

    #[test]
    fn list_members_orders_by_id() {
        let (_dir, store) = open_tmp();
        store.upsert_member(Member::new("carol", "Carol", "U3")).unwrap();
        store.upsert_member(Member::new("alice", "Alice", "U1")).unwrap();
        let ids: Vec<_> = store.list_members().unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["alice", "carol"]);
    }
}
