use chrono::Utc;

use crate::app::{AppContext, Result, ThriftError};
use crate::domain::{time_ago, ChatId, Item, ItemId, ListingFilter, MessageKind, User};

fn find_user(ctx: &AppContext, username: &str) -> Result<User> {
    ctx.store
        .get_user_by_username(username)?
        .ok_or_else(|| ThriftError::Validation(format!("no user named '{}'", username)))
}

fn print_item(item: &Item) {
    let now = Utc::now();
    let boost = if item.is_boost_active(now) { " [boosted]" } else { "" };
    println!(
        "#{} {}{} - {} (was {}, save {}%) {} hearts, {} views, listed {}",
        item.id,
        item.title,
        boost,
        item.price,
        item.original_price,
        item.savings_percentage(),
        item.hearts,
        item.views,
        time_ago(item.created_at, now)
    );
}

pub fn add_user(ctx: &AppContext, username: &str) -> Result<()> {
    if ctx.store.get_user_by_username(username)?.is_some() {
        println!("User already exists: {}", username);
        return Ok(());
    }
    let id = ctx.store.add_user(&User::new(username.to_string()))?;
    println!("Added user {} (id {})", username, id);
    Ok(())
}

pub fn show_user(ctx: &AppContext, username: &str) -> Result<()> {
    let user = find_user(ctx, username)?;
    println!("{} (id {})", user.username, user.id);
    println!("  points: {}", user.points);
    println!("  transactions: {}", user.total_transactions);
    println!("  money saved: {}", user.money_saved);
    if !user.is_active {
        println!("  deactivated");
    }
    println!("  hearted items: {}", user.hearted_item_ids.len());
    println!("  unread messages: {}", ctx.chats.total_unread(user.id)?);
    Ok(())
}

pub fn credit(ctx: &AppContext, username: &str, amount: u64) -> Result<()> {
    let user = find_user(ctx, username)?;
    let user = ctx.ledger.credit(user.id, amount)?;
    println!("{} now has {} points", user.username, user.points);
    Ok(())
}

pub fn debit(ctx: &AppContext, username: &str, amount: u64) -> Result<()> {
    let user = find_user(ctx, username)?;
    let user = ctx.ledger.debit(user.id, amount)?;
    println!("{} now has {} points", user.username, user.points);
    Ok(())
}

pub fn deactivate_user(ctx: &AppContext, username: &str) -> Result<()> {
    let user = find_user(ctx, username)?;
    ctx.ledger.deactivate(user.id)?;
    println!("Deactivated {}", user.username);
    Ok(())
}

pub fn list_hearted(ctx: &AppContext, username: &str) -> Result<()> {
    let user = find_user(ctx, username)?;
    let items = ctx.items.hearted_items(user.id)?;
    if items.is_empty() {
        println!("No hearted listings");
        return Ok(());
    }
    for item in &items {
        print_item(item);
    }
    Ok(())
}

pub fn list_items(ctx: &AppContext) -> Result<()> {
    let items = ctx.items.list_active()?;
    if items.is_empty() {
        println!("No listings");
        return Ok(());
    }
    for item in &items {
        print_item(item);
    }
    Ok(())
}

pub fn list_boosted(ctx: &AppContext) -> Result<()> {
    let items = ctx.items.list_boosted()?;
    if items.is_empty() {
        println!("No boosted listings");
        return Ok(());
    }
    for item in &items {
        print_item(item);
    }
    Ok(())
}

pub fn add_item(
    ctx: &AppContext,
    seller: &str,
    title: &str,
    price: u64,
    original: Option<u64>,
) -> Result<()> {
    let seller = find_user(ctx, seller)?;
    let item = ctx
        .items
        .create_listing(seller.id, title, price, original.unwrap_or(price))?;
    println!("Listed #{}: {}", item.id, item.title);
    Ok(())
}

pub fn list_seller_items(ctx: &AppContext, seller: &str, filter: ListingFilter) -> Result<()> {
    let seller = find_user(ctx, seller)?;
    let items = ctx.items.list_for_seller(seller.id, filter)?;
    if items.is_empty() {
        println!("No listings");
        return Ok(());
    }
    let now = Utc::now();
    for item in &items {
        print_item(item);
        println!("  state: {:?}", item.state(now));
    }
    Ok(())
}

pub fn edit_item(
    ctx: &AppContext,
    seller: &str,
    id: i64,
    title: Option<&str>,
    price: Option<u64>,
    original: Option<u64>,
) -> Result<()> {
    let seller = find_user(ctx, seller)?;
    let item = ctx
        .items
        .update_listing(seller.id, ItemId(id), title, price, original)?;
    print_item(&item);
    Ok(())
}

pub fn show_item(ctx: &AppContext, id: i64) -> Result<()> {
    let item = ctx.items.get_item(ItemId(id))?;
    if !item.is_sold {
        ctx.items.increment_views(item.id)?;
    }
    let item = ctx.items.get_item(item.id)?;
    print_item(&item);
    println!("  state: {:?}", item.state(Utc::now()));
    if let Some(until) = item.boost_expires_at.filter(|_| item.is_boosted) {
        println!("  boosted until {}", until.format("%Y-%m-%d %H:%M"));
    }
    Ok(())
}

pub fn boost_item(ctx: &AppContext, seller: &str, id: i64) -> Result<()> {
    let seller = find_user(ctx, seller)?;
    let item = ctx.market.boost_listing(seller.id, ItemId(id))?;
    println!(
        "Boosted #{} for {} points",
        item.id, ctx.config.boost.cost
    );
    Ok(())
}

pub fn heart_item(ctx: &AppContext, username: &str, id: i64) -> Result<()> {
    let user = find_user(ctx, username)?;
    let (item, hearted) = ctx.items.heart_toggle(ItemId(id), user.id)?;
    let verb = if hearted { "Hearted" } else { "Un-hearted" };
    println!("{} #{} ({} hearts)", verb, item.id, item.hearts);
    Ok(())
}

pub fn sell_item(ctx: &AppContext, id: i64) -> Result<()> {
    let item = ctx.items.mark_sold(ItemId(id))?;
    println!("Marked #{} sold", item.id);
    Ok(())
}

pub fn withdraw_item(ctx: &AppContext, seller: &str, id: i64) -> Result<()> {
    let seller = find_user(ctx, seller)?;
    let item = ctx.items.withdraw(seller.id, ItemId(id))?;
    println!("Withdrew #{}", item.id);
    Ok(())
}

pub fn open_chat(ctx: &AppContext, username: &str, item: i64, message: Option<&str>) -> Result<()> {
    let user = find_user(ctx, username)?;
    let thread = ctx.market.start_chat(user.id, ItemId(item), message)?;
    println!("Chat {}", thread.id);
    Ok(())
}

pub fn send_message(ctx: &AppContext, username: &str, chat: &str, text: &str) -> Result<()> {
    let user = find_user(ctx, username)?;
    let (thread, _) =
        ctx.chats
            .post_message(&ChatId(chat.to_string()), user.id, text, MessageKind::Text)?;
    println!("Sent ({} messages in chat)", thread.messages.len());
    Ok(())
}

pub fn read_chat(ctx: &AppContext, username: &str, chat: &str) -> Result<()> {
    let user = find_user(ctx, username)?;
    let (_, flipped) = ctx.chats.mark_read(&ChatId(chat.to_string()), user.id)?;
    println!("Marked {} messages read", flipped);
    Ok(())
}

pub fn show_chat(ctx: &AppContext, username: &str, chat: &str) -> Result<()> {
    let user = find_user(ctx, username)?;
    let thread = ctx.chats.get_thread(&ChatId(chat.to_string()), user.id)?;
    let now = Utc::now();
    for message in &thread.messages {
        let who = if message.sender_id == user.id {
            "you".to_string()
        } else {
            message.sender_id.to_string()
        };
        let unread = if message.is_read { "" } else { " *" };
        println!(
            "[{}] {}: {}{}",
            time_ago(message.created_at, now),
            who,
            message.content,
            unread
        );
    }
    Ok(())
}

pub fn list_chats(ctx: &AppContext, username: &str) -> Result<()> {
    let user = find_user(ctx, username)?;
    let threads = ctx.chats.list_for_user(user.id)?;
    if threads.is_empty() {
        println!("No conversations");
        return Ok(());
    }

    let now = Utc::now();
    for thread in threads {
        let preview = thread
            .last_message
            .as_ref()
            .map(|m| m.content.as_str())
            .unwrap_or("");
        println!(
            "{} item #{} ({} unread, {}) {}",
            thread.id,
            thread.item_id,
            thread.unread_for(user.id),
            time_ago(thread.last_activity, now),
            preview
        );
    }
    Ok(())
}

pub fn complete_trade(ctx: &AppContext, item: i64, buyer: &str) -> Result<()> {
    let buyer = find_user(ctx, buyer)?;
    let receipt = ctx.market.complete_trade(ItemId(item), buyer.id)?;
    println!(
        "Sold #{} to {}; buyer has {} points, seller has {}",
        receipt.item.id, receipt.buyer.username, receipt.buyer.points, receipt.seller.points
    );
    if receipt.trade.is_none() {
        println!("Warning: the sale went through but was not added to trade history");
    }
    Ok(())
}

pub fn trade_history(ctx: &AppContext, username: &str) -> Result<()> {
    let user = find_user(ctx, username)?;
    let trades = ctx.market.trade_history(user.id)?;
    if trades.is_empty() {
        println!("No trades");
        return Ok(());
    }
    let now = Utc::now();
    for trade in &trades {
        let role = if trade.buyer_id == user.id { "bought" } else { "sold" };
        println!(
            "{} item #{} for {} (saved {}, +{} points) {}",
            role,
            trade.item_id,
            trade.price,
            trade.savings,
            trade.points_awarded,
            time_ago(trade.completed_at, now)
        );
    }
    Ok(())
}
