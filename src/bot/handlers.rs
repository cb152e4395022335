use std::sync::Arc;

use anyhow::Context;
use teloxide::dispatching::UpdateHandler;
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::{
    ButtonRequest, CallbackQuery, ChatId, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, KeyboardRemove, Message,
    MessageId, ParseMode,
};
use teloxide::{ApiError, RequestError};
use tracing::{info, instrument, warn};

use super::callbacks::CallbackAction;
use super::carts::BotCartStore;
use super::context::AppContext;
use super::{Command, HandlerResult};
use crate::domain::aggregates::{CartSnapshot, Order, OrderError, Product, TelegramUser};
use crate::domain::value_objects::{CategoryId, Phone};
use crate::landing::escape;
use crate::services::OrderService;
use crate::ShopError;

type SharedContext = Arc<AppContext>;

const MENU_TEXT: &str = "Меню:";
const CATEGORY_PAGE: i64 = 5;
const DESCRIPTION_PREVIEW: usize = 50;

pub fn build_schema() -> UpdateHandler<anyhow::Error> {
    let command_handler = dptree::entry()
        .filter_command::<Command>()
        .branch(dptree::case![Command::Start].endpoint(handle_start));

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(dptree::filter(|msg: Message| msg.contact().is_some()).endpoint(handle_contact));

    let callback_handler = Update::filter_callback_query().endpoint(handle_callback_query);

    dptree::entry().branch(message_handler).branch(callback_handler)
}

#[instrument(skip(bot, ctx, msg), fields(chat_id = %msg.chat.id))]
async fn handle_start(bot: Bot, ctx: SharedContext, msg: Message) -> HandlerResult {
    let user = msg.from.as_ref().context("message missing sender")?;
    let tg_user = ctx
        .db()
        .get_or_create_telegram_user(user.id.0 as i64, &user.first_name, user.username.as_deref().unwrap_or_default())
        .await?;
    info!(telegram_id = tg_user.telegram_id, linked = tg_user.is_linked(), "received /start");

    if !tg_user.is_linked() {
        bot.send_message(msg.chat.id, "Вітаю! Натисніть кнопку для входу:").reply_markup(contact_keyboard()).await?;
    }
    bot.send_message(msg.chat.id, MENU_TEXT).reply_markup(main_menu()).await?;
    Ok(())
}

/// Links the chat to a storefront account through the shared phone number.
#[instrument(skip(bot, ctx, msg), fields(chat_id = %msg.chat.id))]
async fn handle_contact(bot: Bot, ctx: SharedContext, msg: Message) -> HandlerResult {
    let contact = msg.contact().context("message missing contact")?;
    let user = msg.from.as_ref().context("message missing sender")?;
    if contact.user_id != Some(user.id) {
        info!(telegram_id = user.id.0, "ignoring contact of another user");
        return Ok(());
    }

    let telegram_id = user.id.0 as i64;
    let phone = Phone::normalize_ua(&contact.phone_number)?;
    ctx.db()
        .get_or_create_telegram_user(telegram_id, &user.first_name, user.username.as_deref().unwrap_or_default())
        .await?;
    let (account, created) = ctx.orders().resolve_account(phone.as_str(), &user.first_name).await?;
    ctx.db().link_telegram_user(telegram_id, account.id, phone.as_str()).await?;
    info!(telegram_id, account_id = account.id, created, "chat linked to account");

    bot.send_message(msg.chat.id, "✅ Ви успішно увійшли!").reply_markup(KeyboardRemove::new()).await?;
    Ok(())
}

#[instrument(skip(bot, ctx, query), fields(telegram_id = query.from.id.0))]
async fn handle_callback_query(bot: Bot, ctx: SharedContext, query: CallbackQuery) -> HandlerResult {
    let user_id = query.from.id.0 as i64;
    let mut answer = bot.answer_callback_query(query.id.clone());

    let action = match query.data.as_deref().map(str::parse::<CallbackAction>) {
        Some(Ok(action)) => action,
        Some(Err(err)) => {
            warn!(error = %err, "unrecognized callback");
            answer.await?;
            return Ok(());
        }
        None => {
            answer.await?;
            return Ok(());
        }
    };
    let Some((chat_id, message_id)) = query.message.as_ref().map(|m| (m.chat().id, m.id())) else {
        warn!(?action, "callback without message context");
        answer.await?;
        return Ok(());
    };
    info!(chat_id = %chat_id, ?action, "handling callback");

    match action {
        CallbackAction::Start => edit(&bot, chat_id, message_id, MENU_TEXT, main_menu(), false).await?,
        CallbackAction::Catalog => show_catalog(&bot, &ctx, chat_id, message_id).await?,
        CallbackAction::Category(category_id) => show_category(&bot, &ctx, chat_id, message_id, category_id).await?,
        CallbackAction::Add(product_id) => {
            let quantity = ctx.carts().add(user_id, product_id);
            info!(product_id, quantity, "added to bot cart");
            answer = answer.text("Додано");
        }
        CallbackAction::Cart => show_cart(&bot, &ctx, chat_id, message_id, user_id).await?,
        CallbackAction::Clear => {
            ctx.carts().clear(user_id);
            answer = answer.text("Очищено");
            show_cart(&bot, &ctx, chat_id, message_id, user_id).await?;
        }
        CallbackAction::Checkout => checkout(&bot, &ctx, &query, chat_id, message_id).await?,
    }
    answer.await?;
    Ok(())
}

async fn show_catalog(bot: &Bot, ctx: &SharedContext, chat_id: ChatId, message_id: MessageId) -> HandlerResult {
    let categories = ctx.db().categories().await?;
    let mut rows: Vec<Vec<InlineKeyboardButton>> = categories
        .into_iter()
        .map(|c| vec![InlineKeyboardButton::callback(c.name, CallbackAction::Category(c.id).to_string())])
        .collect();
    rows.push(vec![InlineKeyboardButton::callback("🔙 Назад", CallbackAction::Start.to_string())]);
    edit(bot, chat_id, message_id, "Категорії:", InlineKeyboardMarkup::new(rows), false).await
}

async fn show_category(bot: &Bot, ctx: &SharedContext, chat_id: ChatId, message_id: MessageId, category_id: CategoryId) -> HandlerResult {
    let products = ctx.db().products_in_category(category_id, CATEGORY_PAGE).await?;
    if products.is_empty() {
        return edit(bot, chat_id, message_id, "Порожньо", back_to(CallbackAction::Catalog), false).await;
    }
    for product in &products {
        let buy = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback("Купити", CallbackAction::Add(product.id).to_string())]]);
        bot.send_message(chat_id, product_caption(product)).parse_mode(ParseMode::Html).reply_markup(buy).await?;
    }
    bot.send_message(chat_id, "---").reply_markup(back_to(CallbackAction::Catalog)).await?;
    Ok(())
}

async fn show_cart(bot: &Bot, ctx: &SharedContext, chat_id: ChatId, message_id: MessageId, user_id: i64) -> HandlerResult {
    let cart = ctx.carts().cart(user_id);
    let catalog = ctx.db().products_by_ids(&cart.product_ids()).await?;
    let snapshot = cart.snapshot(&catalog);
    if snapshot.is_empty() {
        return edit(bot, chat_id, message_id, "Кошик порожній", back_to(CallbackAction::Start), false).await;
    }
    let keyboard = InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("✅ Замовити", CallbackAction::Checkout.to_string())],
        vec![InlineKeyboardButton::callback("❌ Очистити", CallbackAction::Clear.to_string())],
    ]);
    edit(bot, chat_id, message_id, &cart_text(&snapshot), keyboard, true).await
}

async fn checkout(bot: &Bot, ctx: &SharedContext, query: &CallbackQuery, chat_id: ChatId, message_id: MessageId) -> HandlerResult {
    let user_id = query.from.id.0 as i64;
    if ctx.carts().cart(user_id).is_empty() {
        return Ok(());
    }
    let tg_user = ctx
        .db()
        .get_or_create_telegram_user(user_id, &query.from.first_name, query.from.username.as_deref().unwrap_or_default())
        .await?;

    let text = match place_order(ctx.carts(), ctx.orders(), &tg_user).await? {
        Some(order) => format!("Замовлення #{} прийнято!", order.id),
        None => "Кошик порожній".to_string(),
    };
    edit(bot, chat_id, message_id, &text, back_to(CallbackAction::Start), false).await
}

/// Turns the user's bot cart into an order. The stored cart is cleared once the
/// order exists, or when nothing in it still resolves; `None` in the latter case.
async fn place_order(carts: &dyn BotCartStore, orders: &OrderService, user: &TelegramUser) -> crate::Result<Option<Order>> {
    let mut cart = carts.cart(user.telegram_id);
    match orders.bot_checkout(&mut cart, user).await {
        Ok(order) => {
            carts.clear(user.telegram_id);
            Ok(Some(order))
        }
        Err(ShopError::Order(OrderError::NoItems) | ShopError::EmptyCart) => {
            carts.clear(user.telegram_id);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

async fn edit(bot: &Bot, chat_id: ChatId, message_id: MessageId, text: &str, keyboard: InlineKeyboardMarkup, html: bool) -> HandlerResult {
    let mut request = bot.edit_message_text(chat_id, message_id, text).reply_markup(keyboard);
    if html {
        request = request.parse_mode(ParseMode::Html);
    }
    match request.await {
        Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn main_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("👗 Каталог", CallbackAction::Catalog.to_string())],
        vec![InlineKeyboardButton::callback("🛒 Кошик", CallbackAction::Cart.to_string())],
    ])
}

fn contact_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new("📱 Авторизація").request(ButtonRequest::Contact)]])
        .resize_keyboard()
        .one_time_keyboard()
}

fn back_to(action: CallbackAction) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback("🔙", action.to_string())]])
}

fn product_caption(product: &Product) -> String {
    format!(
        "<b>{}</b>\n{}\n💰 <b>{}</b>",
        escape(&product.name),
        escape(&product.short_description(DESCRIPTION_PREVIEW)),
        product.price
    )
}

fn cart_text(snapshot: &CartSnapshot) -> String {
    let mut text = String::from("🛒 <b>КОШИК:</b>\n");
    for line in &snapshot.lines {
        text.push_str(&format!("{} x {} = {}\n", escape(&line.product.name), line.quantity, line.line_total));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::carts::MockBotCartStore;
    use crate::domain::aggregates::{Cart, Customer, Delivery, OrderSource, OrderStatus, PaymentMethod};
    use crate::domain::value_objects::Money;
    use crate::notify::{MockNotifier, NotificationDispatcher};
    use crate::services::checkout::MockOrderStore;
    use crate::settings::SiteSettings;
    use chrono::Utc;
    use std::collections::HashMap;

    fn product(id: i64, name: &str, price: i64) -> Product {
        Product {
            id, category_id: 1, name: name.into(), description: "Легка сукня з льону на літо, довжина міді, з поясом у комплекті".into(),
            price: Money::from_units(price), old_price: None, image: None, sizes: String::new(), colors: String::new(), is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_product_caption() {
        let caption = product_caption(&product(1, "Сукня <Літо>", 1200));
        let lines: Vec<&str> = caption.lines().collect();
        assert_eq!(lines[0], "<b>Сукня &lt;Літо&gt;</b>");
        assert_eq!(lines[1].chars().count(), DESCRIPTION_PREVIEW);
        assert_eq!(lines[2], "💰 <b>1200</b>");
    }

    #[test]
    fn test_cart_text_skips_vanished_products() {
        let mut cart = Cart::new();
        cart.add(5);
        cart.add(5);
        cart.add(7);
        cart.add(99);
        let catalog: HashMap<_, _> = [(5, product(5, "A", 500)), (7, product(7, "B", 300))].into_iter().collect();
        assert_eq!(cart_text(&cart.snapshot(&catalog)), "🛒 <b>КОШИК:</b>\nA x 2 = 1000\nB x 1 = 300\n");
    }

    fn service(insert_fails: bool) -> OrderService {
        let mut store = MockOrderStore::new();
        store.expect_products_by_ids().returning(|_| Ok([(5, product(5, "A", 500))].into_iter().collect()));
        store.expect_site_settings().returning(|| Ok(SiteSettings::default()));
        store.expect_insert_order().returning(move |_| {
            if insert_fails {
                return Err(ShopError::StorageError(sqlx::Error::PoolTimedOut));
            }
            Ok(Order {
                id: 42, account_id: None, items: vec![], customer: Customer::default(), delivery: Delivery::bot_placeholder(),
                payment_method: PaymentMethod::default(), status: OrderStatus::New, tracking_number: String::new(),
                total_price: Money::from_units(500), source: OrderSource::Bot, created_at: Utc::now(),
            })
        });
        OrderService::new(Arc::new(store), NotificationDispatcher::new(Arc::new(MockNotifier::new())))
    }

    fn user() -> TelegramUser {
        TelegramUser { telegram_id: 77, account_id: None, first_name: "Ira".into(), username: String::new(), phone_number: String::new() }
    }

    fn carts_with_one_item(clears: usize) -> MockBotCartStore {
        let mut carts = MockBotCartStore::new();
        carts.expect_cart().withf(|id| *id == 77).returning(|_| {
            let mut cart = Cart::new();
            cart.add(5);
            cart
        });
        carts.expect_clear().withf(|id| *id == 77).times(clears).return_const(());
        carts
    }

    #[tokio::test]
    async fn test_place_order_clears_cart() {
        let order = place_order(&carts_with_one_item(1), &service(false), &user()).await.unwrap();
        assert_eq!(order.map(|o| o.id), Some(42));
    }

    #[tokio::test]
    async fn test_failed_order_keeps_cart() {
        let result = place_order(&carts_with_one_item(0), &service(true), &user()).await;
        assert!(matches!(result, Err(ShopError::StorageError(_))));
    }

    #[test]
    fn test_menu_callbacks() {
        let menu = main_menu();
        let data: Vec<_> = menu.inline_keyboard.iter().flatten().map(|b| format!("{:?}", b.kind)).collect();
        assert!(data[0].contains("catalog"));
        assert!(data[1].contains("cart"));
    }
}
