//! Lookup lists for clients and users.

use super::Api;
use crate::backend::{rows_as, Client, Order, Profile, Query};
use crate::error::MecalError;

pub struct Directory<'a> {
    api: &'a Api<'a>,
}

impl<'a> Directory<'a> {
    pub(super) const fn new(api: &'a Api<'a>) -> Self {
        Self { api }
    }

    /// # Errors
    ///
    /// Returns the backend error if the select fails.
    pub fn clients(&self) -> Result<Vec<Client>, MecalError> {
        let query = Query::new().select("id,name").order("name", Order::Asc);
        rows_as(self.api.backend.select("clients", &query)?)
    }

    /// # Errors
    ///
    /// Returns the backend error if the select fails.
    pub fn profiles(&self) -> Result<Vec<Profile>, MecalError> {
        let query = Query::new()
            .select("id,full_name,role")
            .order("full_name", Order::Asc);
        rows_as(self.api.backend.select("profiles", &query)?)
    }
}
