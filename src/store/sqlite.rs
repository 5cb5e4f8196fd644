use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Params, Row};
use rusqlite_migration::{Migrations, M};
use serde::de::DeserializeOwned;

use crate::app::{Result, ThriftError};
use crate::domain::{
    ChatId, ChatThread, Item, ItemId, LastMessage, Message, MessageKind, ThreadKey, TradeRecord,
    User, UserId,
};
use crate::store::Store;

const USER_COLUMNS: &str = "id, username, points, total_transactions, hearted_item_ids, is_active,
     version, created_at, money_saved";

const ITEM_COLUMNS: &str = "id, seller_id, title, price, original_price, is_active, is_sold, sold_at,
     is_boosted, boost_expires_at, hearts, hearted_by, views, version, created_at";

const TRADE_COLUMNS: &str = "id, item_id, buyer_id, seller_id, price, original_price, savings,
     points_awarded, completed_at";

const CHAT_COLUMNS: &str = "id, participant_a, participant_b, item_id, last_message, unread_a, unread_b,
     last_activity, is_active, version, created_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![
            M::up(include_str!("../../migrations/001-initial/up.sql")),
            M::up(include_str!("../../migrations/002-trades/up.sql")),
        ]);

        let mut conn = self.conn()?;

        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations.to_latest(&mut conn)?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            ThriftError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    /// Fixed-width RFC 3339 so text ordering matches time ordering.
    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn datetime_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
        let raw: String = row.get(idx)?;
        Self::parse_datetime(&raw).ok_or_else(|| Self::bad_timestamp(idx, &raw))
    }

    fn optional_datetime_column(
        row: &Row<'_>,
        idx: usize,
    ) -> rusqlite::Result<Option<DateTime<Utc>>> {
        match row.get::<_, Option<String>>(idx)? {
            Some(raw) => Self::parse_datetime(&raw)
                .map(Some)
                .ok_or_else(|| Self::bad_timestamp(idx, &raw)),
            None => Ok(None),
        }
    }

    fn bad_timestamp(idx: usize, raw: &str) -> rusqlite::Error {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp {:?}", raw).into(),
        )
    }

    fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
        let raw: String = row.get(idx)?;
        serde_json::from_str(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: UserId(row.get(0)?),
            username: row.get(1)?,
            points: row.get::<_, i64>(2)? as u64,
            total_transactions: row.get::<_, i64>(3)? as u64,
            hearted_item_ids: Self::json_column(row, 4)?,
            is_active: row.get::<_, i32>(5)? != 0,
            version: row.get(6)?,
            created_at: Self::datetime_column(row, 7)?,
            money_saved: row.get::<_, i64>(8)? as u64,
        })
    }

    fn trade_from_row(row: &Row<'_>) -> rusqlite::Result<TradeRecord> {
        Ok(TradeRecord {
            id: row.get(0)?,
            item_id: ItemId(row.get(1)?),
            buyer_id: UserId(row.get(2)?),
            seller_id: UserId(row.get(3)?),
            price: row.get::<_, i64>(4)? as u64,
            original_price: row.get::<_, i64>(5)? as u64,
            savings: row.get::<_, i64>(6)? as u64,
            points_awarded: row.get::<_, i64>(7)? as u64,
            completed_at: Self::datetime_column(row, 8)?,
        })
    }

    fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
        Ok(Item {
            id: ItemId(row.get(0)?),
            seller_id: UserId(row.get(1)?),
            title: row.get(2)?,
            price: row.get::<_, i64>(3)? as u64,
            original_price: row.get::<_, i64>(4)? as u64,
            is_active: row.get::<_, i32>(5)? != 0,
            is_sold: row.get::<_, i32>(6)? != 0,
            sold_at: Self::optional_datetime_column(row, 7)?,
            is_boosted: row.get::<_, i32>(8)? != 0,
            boost_expires_at: Self::optional_datetime_column(row, 9)?,
            hearts: row.get::<_, i64>(10)? as u64,
            hearted_by: Self::json_column(row, 11)?,
            views: row.get::<_, i64>(12)? as u64,
            version: row.get(13)?,
            created_at: Self::datetime_column(row, 14)?,
        })
    }

    fn chat_from_row(row: &Row<'_>) -> rusqlite::Result<ChatThread> {
        let a = UserId(row.get(1)?);
        let b = UserId(row.get(2)?);
        let last_message: Option<LastMessage> = match row.get::<_, Option<String>>(4)? {
            Some(raw) => Some(serde_json::from_str(&raw).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e))
            })?),
            None => None,
        };
        Ok(ChatThread {
            id: ChatId(row.get(0)?),
            participants: [a, b],
            item_id: ItemId(row.get(3)?),
            messages: Vec::new(),
            last_message,
            unread_count: [(a, row.get::<_, u32>(5)?), (b, row.get::<_, u32>(6)?)]
                .into_iter()
                .collect(),
            last_activity: Self::datetime_column(row, 7)?,
            is_active: row.get::<_, i32>(8)? != 0,
            version: row.get(9)?,
            created_at: Self::datetime_column(row, 10)?,
        })
    }

    fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
        let kind: String = row.get(3)?;
        Ok(Message {
            id: row.get(0)?,
            sender_id: UserId(row.get(1)?),
            content: row.get(2)?,
            kind: kind.parse().unwrap_or(MessageKind::Text),
            is_read: row.get::<_, i32>(4)? != 0,
            read_at: Self::optional_datetime_column(row, 5)?,
            created_at: Self::datetime_column(row, 6)?,
        })
    }

    fn load_chat<P: Params>(conn: &Connection, filter: &str, params: P) -> Result<Option<ChatThread>> {
        let sql = format!("SELECT {} FROM chats WHERE {}", CHAT_COLUMNS, filter);
        let thread = conn.query_row(&sql, params, Self::chat_from_row).optional()?;

        match thread {
            Some(mut thread) => {
                thread.messages = Self::load_messages(conn, &thread.id)?;
                Ok(Some(thread))
            }
            None => Ok(None),
        }
    }

    fn load_messages(conn: &Connection, chat_id: &ChatId) -> Result<Vec<Message>> {
        let mut stmt = conn.prepare(
            "SELECT seq, sender_id, content, kind, is_read, read_at, created_at
             FROM messages WHERE chat_id = ?1 ORDER BY seq",
        )?;
        let messages = stmt
            .query_map(params![chat_id.0], Self::message_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    fn upsert_messages(conn: &Connection, thread: &ChatThread) -> Result<()> {
        let mut stmt = conn.prepare(
            "INSERT INTO messages (chat_id, seq, sender_id, content, kind, is_read, read_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(chat_id, seq) DO UPDATE SET is_read = excluded.is_read, read_at = excluded.read_at",
        )?;
        for message in &thread.messages {
            stmt.execute(params![
                thread.id.0,
                message.id,
                message.sender_id.0,
                message.content,
                message.kind.as_str(),
                message.is_read as i32,
                message.read_at.as_ref().map(Self::format_datetime),
                Self::format_datetime(&message.created_at),
            ])?;
        }
        Ok(())
    }

    fn query_items<P: Params>(&self, filter: &str, params: P) -> Result<Vec<Item>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM items WHERE {} ORDER BY is_boosted DESC, created_at DESC",
            ITEM_COLUMNS, filter
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params, Self::item_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }
}

impl Store for SqliteStore {
    fn add_user(&self, user: &User) -> Result<UserId> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO users (username, points, total_transactions, money_saved, hearted_item_ids,
                 is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.username,
                user.points as i64,
                user.total_transactions as i64,
                user.money_saved as i64,
                serde_json::to_string(&user.hearted_item_ids)?,
                user.is_active as i32,
                Self::format_datetime(&user.created_at),
            ],
        )?;

        Ok(UserId(conn.last_insert_rowid()))
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
        let user = conn
            .query_row(&sql, params![id.0], Self::user_from_row)
            .optional()?;
        Ok(user)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS);
        let user = conn
            .query_row(&sql, params![username], Self::user_from_row)
            .optional()?;
        Ok(user)
    }

    fn update_user(&self, user: &mut User) -> Result<bool> {
        let conn = self.conn()?;

        let changed = conn.execute(
            "UPDATE users SET username = ?1, points = ?2, total_transactions = ?3, money_saved = ?4,
                 hearted_item_ids = ?5, is_active = ?6, version = version + 1
             WHERE id = ?7 AND version = ?8",
            params![
                user.username,
                user.points as i64,
                user.total_transactions as i64,
                user.money_saved as i64,
                serde_json::to_string(&user.hearted_item_ids)?,
                user.is_active as i32,
                user.id.0,
                user.version,
            ],
        )?;

        if changed == 0 {
            return Ok(false);
        }
        user.version += 1;
        Ok(true)
    }

    fn add_item(&self, item: &Item) -> Result<ItemId> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO items (seller_id, title, price, original_price, is_active, is_sold, sold_at,
                 is_boosted, boost_expires_at, hearts, hearted_by, views, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                item.seller_id.0,
                item.title,
                item.price as i64,
                item.original_price as i64,
                item.is_active as i32,
                item.is_sold as i32,
                item.sold_at.as_ref().map(Self::format_datetime),
                item.is_boosted as i32,
                item.boost_expires_at.as_ref().map(Self::format_datetime),
                item.hearts as i64,
                serde_json::to_string(&item.hearted_by)?,
                item.views as i64,
                Self::format_datetime(&item.created_at),
            ],
        )?;

        Ok(ItemId(conn.last_insert_rowid()))
    }

    fn get_item(&self, id: ItemId) -> Result<Option<Item>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM items WHERE id = ?1", ITEM_COLUMNS);
        let item = conn
            .query_row(&sql, params![id.0], Self::item_from_row)
            .optional()?;
        Ok(item)
    }

    fn list_active_items(&self) -> Result<Vec<Item>> {
        self.query_items("is_active = 1 AND is_sold = 0", params![])
    }

    fn list_boosted_items(&self) -> Result<Vec<Item>> {
        self.query_items("is_boosted = 1 AND is_sold = 0", params![])
    }

    fn list_items_by_seller(&self, seller_id: UserId) -> Result<Vec<Item>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM items WHERE seller_id = ?1 ORDER BY created_at DESC",
            ITEM_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![seller_id.0], Self::item_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn update_item(&self, item: &mut Item) -> Result<bool> {
        let conn = self.conn()?;

        // views is deliberately absent: it is only ever bumped in place.
        let changed = conn.execute(
            "UPDATE items SET title = ?1, price = ?2, original_price = ?3, is_active = ?4,
                 is_sold = ?5, sold_at = ?6, is_boosted = ?7, boost_expires_at = ?8,
                 hearts = ?9, hearted_by = ?10, version = version + 1
             WHERE id = ?11 AND version = ?12",
            params![
                item.title,
                item.price as i64,
                item.original_price as i64,
                item.is_active as i32,
                item.is_sold as i32,
                item.sold_at.as_ref().map(Self::format_datetime),
                item.is_boosted as i32,
                item.boost_expires_at.as_ref().map(Self::format_datetime),
                item.hearts as i64,
                serde_json::to_string(&item.hearted_by)?,
                item.id.0,
                item.version,
            ],
        )?;

        if changed == 0 {
            return Ok(false);
        }
        item.version += 1;
        Ok(true)
    }

    fn increment_views(&self, id: ItemId) -> Result<Option<u64>> {
        let conn = self.conn()?;

        let changed = conn.execute(
            "UPDATE items SET views = views + 1 WHERE id = ?1",
            params![id.0],
        )?;
        if changed == 0 {
            return Ok(None);
        }

        let views: i64 = conn.query_row(
            "SELECT views FROM items WHERE id = ?1",
            params![id.0],
            |row| row.get(0),
        )?;
        Ok(Some(views as u64))
    }

    fn add_trade(&self, trade: &TradeRecord) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO transactions (item_id, buyer_id, seller_id, price, original_price, savings,
                 points_awarded, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                trade.item_id.0,
                trade.buyer_id.0,
                trade.seller_id.0,
                trade.price as i64,
                trade.original_price as i64,
                trade.savings as i64,
                trade.points_awarded as i64,
                Self::format_datetime(&trade.completed_at),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn list_trades_for_user(&self, user_id: UserId) -> Result<Vec<TradeRecord>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM transactions WHERE buyer_id = ?1 OR seller_id = ?1
             ORDER BY completed_at DESC",
            TRADE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let trades = stmt
            .query_map(params![user_id.0], Self::trade_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(trades)
    }

    fn get_chat(&self, id: &ChatId) -> Result<Option<ChatThread>> {
        let conn = self.conn()?;
        Self::load_chat(&conn, "id = ?1", params![id.0])
    }

    fn find_chat(&self, key: &ThreadKey) -> Result<Option<ChatThread>> {
        let conn = self.conn()?;
        let [a, b] = key.participants();
        Self::load_chat(
            &conn,
            "participant_a = ?1 AND participant_b = ?2 AND item_id = ?3",
            params![a.0, b.0, key.item_id().0],
        )
    }

    fn insert_chat_if_absent(&self, thread: &ChatThread) -> Result<(ChatThread, bool)> {
        let mut conn = self.conn()?;
        let [a, b] = thread.participants;

        let tx = conn.transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO chats (id, participant_a, participant_b, item_id, last_message,
                 unread_a, unread_b, last_activity, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                thread.id.0,
                a.0,
                b.0,
                thread.item_id.0,
                thread
                    .last_message
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                thread.unread_for(a),
                thread.unread_for(b),
                Self::format_datetime(&thread.last_activity),
                thread.is_active as i32,
                Self::format_datetime(&thread.created_at),
            ],
        )?;
        if inserted == 1 {
            Self::upsert_messages(&tx, thread)?;
        }
        tx.commit()?;

        // The unique key, not the id, decides which row wins.
        let stored = Self::load_chat(
            &conn,
            "participant_a = ?1 AND participant_b = ?2 AND item_id = ?3",
            params![a.0, b.0, thread.item_id.0],
        )?
        .ok_or_else(|| ThriftError::ChatNotFound(thread.id.clone()))?;

        Ok((stored, inserted == 1))
    }

    fn update_chat(&self, thread: &mut ChatThread) -> Result<bool> {
        let mut conn = self.conn()?;
        let [a, b] = thread.participants;

        let tx = conn.transaction()?;
        let changed = tx.execute(
            "UPDATE chats SET last_message = ?1, unread_a = ?2, unread_b = ?3, last_activity = ?4,
                 is_active = ?5, version = version + 1
             WHERE id = ?6 AND version = ?7",
            params![
                thread
                    .last_message
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                thread.unread_for(a),
                thread.unread_for(b),
                Self::format_datetime(&thread.last_activity),
                thread.is_active as i32,
                thread.id.0,
                thread.version,
            ],
        )?;
        if changed == 0 {
            // Dropping the transaction rolls it back.
            return Ok(false);
        }
        Self::upsert_messages(&tx, thread)?;
        tx.commit()?;

        thread.version += 1;
        Ok(true)
    }

    fn list_chats_for_user(&self, user_id: UserId) -> Result<Vec<ChatThread>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id FROM chats WHERE participant_a = ?1 OR participant_b = ?1
             ORDER BY last_activity DESC",
        )?;
        let ids = stmt
            .query_map(params![user_id.0], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut threads = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(thread) = Self::load_chat(&conn, "id = ?1", params![id])? {
                threads.push(thread);
            }
        }
        Ok(threads)
    }
}
