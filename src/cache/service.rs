//! JSON Cache Helpers
//!
//! [`CacheService`] stores values as JSON text through a [`CacheClient`] and
//! decodes them back with `serde_json`.
//!
//! An absent key and a key holding an empty string both read as `None`.
//! Inside collections, empty elements are skipped rather than failing the
//! whole read.

use super::{CacheClient, DEFAULT_TTL};
use crate::error::{Error, Result};
use crate::storage::KeyValueStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Typed, JSON-encoded helpers over a shared store.
///
/// # Example
///
/// ```
/// use rediskit::cache::CacheService;
/// use rediskit::storage::StorageEngine;
/// use serde::{Deserialize, Serialize};
/// use std::sync::Arc;
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// let service = CacheService::from_store(Arc::new(StorageEngine::new()));
/// let user = User { id: 7, name: "Ariz".into() };
///
/// service.set_json("user:7", &user).unwrap();
/// assert_eq!(service.get_json::<User>("user:7").unwrap(), Some(user));
/// ```
pub struct CacheService<S: ?Sized = dyn KeyValueStore> {
    client: CacheClient<S>,
}

impl<S: ?Sized> Clone for CacheService<S> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
        }
    }
}

impl<S: ?Sized> fmt::Debug for CacheService<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheService")
            .field("client", &self.client)
            .finish()
    }
}

fn encode<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|source| Error::Encode {
        key: key.to_owned(),
        source,
    })
}

fn decode<T: DeserializeOwned>(key: &str, raw: Option<String>) -> Result<Option<T>> {
    match raw {
        Some(raw) if !raw.is_empty() => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| Error::Decode {
                key: key.to_owned(),
                source,
            }),
        _ => Ok(None),
    }
}

fn decode_each<T, I>(key: &str, raw: I) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    I: IntoIterator<Item = String>,
{
    raw.into_iter()
        .filter_map(|raw| decode(key, Some(raw)).transpose())
        .collect()
}

impl<S: KeyValueStore + ?Sized> CacheService<S> {
    pub fn new(client: CacheClient<S>) -> Self {
        Self { client }
    }

    /// Builds the service over its own [`CacheClient`] for `store`.
    pub fn from_store(store: Arc<S>) -> Self {
        Self::new(CacheClient::new(store))
    }

    /// The string helpers this service encodes through.
    pub fn client(&self) -> &CacheClient<S> {
        &self.client
    }

    /// Expires `key` after [`DEFAULT_TTL`].
    pub fn expire(&self, key: &str) -> bool {
        self.client.expire(key)
    }

    pub fn expire_in(&self, key: &str, ttl: Duration) -> bool {
        self.client.expire_in(key, ttl)
    }

    // ==================== Strings ====================

    /// Stores `value` as JSON with no expiry.
    pub fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.client.set(key, &encode(key, value)?);
        Ok(())
    }

    /// Stores `value` as JSON, expiring after `ttl`.
    pub fn set_json_with_ttl<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        self.client.set_with_ttl(key, &encode(key, value)?, ttl);
        Ok(())
    }

    /// Stores `value` as JSON, expiring after [`DEFAULT_TTL`].
    pub fn set_json_with_default_ttl<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<()> {
        self.set_json_with_ttl(key, value, DEFAULT_TTL)
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        decode(key, self.client.get(key)?)
    }

    /// Reads a value stored as a JSON array. Absent or empty reads as an empty list.
    pub fn get_json_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        Ok(decode::<Vec<T>>(key, self.client.get(key)?)?.unwrap_or_default())
    }

    // ==================== Hashes ====================

    pub fn hash_get_json<T: DeserializeOwned>(&self, key: &str, field: &str) -> Result<Option<T>> {
        decode(key, self.client.hash_get(key, field)?)
    }

    pub fn hash_put_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        field: &str,
        value: &T,
    ) -> Result<()> {
        self.client.hash_put(key, field, &encode(key, value)?)?;
        Ok(())
    }

    /// Decodes several fields, in request order. Missing or empty fields are `None`.
    pub fn hash_multi_get_json<T, I>(&self, key: &str, fields: I) -> Result<Vec<Option<T>>>
    where
        T: DeserializeOwned,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.client
            .hash_multi_get(key, fields)?
            .into_iter()
            .map(|raw| decode(key, raw))
            .collect()
    }

    pub fn hash_values_json<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        decode_each(key, self.client.hash_values(key)?)
    }

    /// Decodes every field value. Fields holding an empty string are left out.
    pub fn hash_entries_json<T>(&self, key: &str) -> Result<HashMap<String, T>>
    where
        T: DeserializeOwned,
    {
        self.client
            .hash_entries(key)?
            .into_iter()
            .filter_map(|(field, raw)| {
                decode(key, Some(raw))
                    .transpose()
                    .map(|value| value.map(|value| (field, value)))
            })
            .collect()
    }

    // ==================== Lists ====================

    /// Pops the head of the list and decodes it.
    ///
    /// The element is removed before decoding, so on a decode error it is lost.
    pub fn list_left_pop_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        decode(key, self.client.list_left_pop(key)?)
    }

    /// Pops the tail of the list and decodes it.
    ///
    /// The element is removed before decoding, so on a decode error it is lost.
    pub fn list_right_pop_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        decode(key, self.client.list_right_pop(key)?)
    }

    pub fn list_range_json<T>(&self, key: &str, start: i64, stop: i64) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        decode_each(key, self.client.list_range(key, start, stop)?)
    }

    /// Appends `value` as JSON. Returns the new length.
    pub fn list_right_push_json<T>(&self, key: &str, value: &T) -> Result<usize>
    where
        T: Serialize + ?Sized,
    {
        self.client.list_right_push(key, &encode(key, value)?)
    }

    // ==================== Sets ====================

    /// Removes a random member and decodes it.
    ///
    /// The member is removed before decoding, so on a decode error it is lost.
    pub fn set_pop_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        decode(key, self.client.set_pop(key)?)
    }

    /// Removes up to `count` random members and decodes them. Like
    /// [`set_pop_json`](Self::set_pop_json), members are gone even if decoding fails.
    pub fn set_pop_count_json<T>(&self, key: &str, count: usize) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        decode_each(key, self.client.set_pop_count(key, count)?)
    }

    /// Decodes every member. Order is unspecified.
    pub fn set_members_json<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        decode_each(key, self.client.set_members(key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyTtl, StorageEngine};
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Order {
        id: u32,
        item: String,
        qty: u32,
    }

    fn order(id: u32, item: &str, qty: u32) -> Order {
        Order {
            id,
            item: item.to_string(),
            qty,
        }
    }

    fn service() -> CacheService<StorageEngine> {
        CacheService::from_store(Arc::new(StorageEngine::new()))
    }

    #[test]
    fn test_json_round_trip_and_absent() {
        let service = service();

        service.set_json("order:1", &order(1, "pen", 3)).unwrap();
        assert_eq!(
            service.get_json::<Order>("order:1").unwrap(),
            Some(order(1, "pen", 3))
        );
        assert_eq!(service.get_json::<Order>("order:2").unwrap(), None);
    }

    #[test]
    fn test_empty_string_reads_as_none() {
        let service = service();

        service.client().set("blank", "");
        assert_eq!(service.get_json::<Order>("blank").unwrap(), None);
        assert!(service.get_json_list::<Order>("blank").unwrap().is_empty());
    }

    #[test]
    fn test_decode_error_names_key() {
        let service = service();

        service.client().set("broken", "{not json");
        assert!(matches!(
            service.get_json::<Order>("broken"),
            Err(Error::Decode { key, .. }) if key == "broken"
        ));
    }

    #[test]
    fn test_json_ttl() {
        let service = service();

        service.set_json("plain", &1).unwrap();
        assert_eq!(service.client().ttl("plain"), KeyTtl::Persistent);

        service.set_json_with_default_ttl("cached", &vec![1, 2, 3]).unwrap();
        assert!(matches!(service.client().ttl("cached"), KeyTtl::Expires(_)));

        assert!(service.expire_in("plain", Duration::from_secs(5)));
        assert!(service.client().ttl("plain").as_secs() <= 5);
    }

    #[test]
    fn test_json_list() {
        let service = service();

        let orders = vec![order(1, "pen", 3), order(2, "ink", 1)];
        service.set_json("orders", &orders).unwrap();
        assert_eq!(service.get_json_list::<Order>("orders").unwrap(), orders);
        assert!(service.get_json_list::<Order>("none").unwrap().is_empty());
    }

    #[test]
    fn test_hash_json() {
        let service = service();

        service.hash_put_json("orders", "1", &order(1, "pen", 3)).unwrap();
        service.hash_put_json("orders", "2", &order(2, "ink", 1)).unwrap();
        service.client().hash_put("orders", "3", "").unwrap();

        assert_eq!(
            service.hash_get_json::<Order>("orders", "2").unwrap(),
            Some(order(2, "ink", 1))
        );
        assert_eq!(
            service
                .hash_multi_get_json::<Order, _>("orders", ["1", "3", "9"])
                .unwrap(),
            vec![Some(order(1, "pen", 3)), None, None]
        );

        let mut values: Vec<Order> = service.hash_values_json("orders").unwrap();
        values.sort_by_key(|o| o.id);
        assert_eq!(values, vec![order(1, "pen", 3), order(2, "ink", 1)]);

        let entries: HashMap<String, Order> = service.hash_entries_json("orders").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries["1"].item, "pen");
    }

    #[test]
    fn test_list_json() {
        let service = service();

        for id in 1..=3 {
            service.list_right_push_json("queue", &order(id, "pen", id)).unwrap();
        }

        let middle: Vec<Order> = service.list_range_json("queue", 1, 1).unwrap();
        assert_eq!(middle, vec![order(2, "pen", 2)]);

        assert_eq!(
            service.list_left_pop_json::<Order>("queue").unwrap().map(|o| o.id),
            Some(1)
        );
        assert_eq!(
            service.list_right_pop_json::<Order>("queue").unwrap().map(|o| o.id),
            Some(3)
        );
    }

    #[test]
    fn test_failed_pop_decode_consumes_element() {
        let service = service();
        service.client().list_right_push("queue", "not json").unwrap();

        assert!(matches!(
            service.list_left_pop_json::<Order>("queue"),
            Err(Error::Decode { .. })
        ));
        assert_eq!(service.client().list_size("queue").unwrap(), 0);
    }

    #[test]
    fn test_set_json() {
        let service = service();

        service.client().set_add_all("ids", ["1", "2", "3", ""]).unwrap();

        let mut members: Vec<u32> = service.set_members_json("ids").unwrap();
        members.sort_unstable();
        assert_eq!(members, vec![1, 2, 3]);

        let popped: Vec<u32> = service.set_pop_count_json("ids", 2).unwrap();
        assert!(popped.len() <= 2);
        let remaining = service.client().set_size("ids").unwrap();
        assert_eq!(remaining, 2);

        while service.client().set_size("ids").unwrap() > 0 {
            let _ = service.set_pop_json::<u32>("ids").unwrap();
        }
        assert_eq!(service.set_pop_json::<u32>("ids").unwrap(), None);
    }
}
