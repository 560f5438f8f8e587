//! Screen stack for the application shell.
//!
//! The stack always holds at least one screen. Top-level tabs replace the
//! whole stack; everything else is pushed on top and popped by `go_back`.

use std::fmt;

use techshop_core::{OrderId, Product, ProductId};

/// Every screen the shell can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Home,
    Search,
    Cart,
    Profile,
    Admin,
    ProductDetail,
    OrderDetail,
    EditProfile,
    OrderHistory,
    Addresses,
    Favorites,
    Settings,
    Checkout,
    Notifications,
}

/// Screens reachable from the bottom navigation bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    Home,
    Search,
    Cart,
    Profile,
    Admin,
}

impl From<Tab> for Screen {
    fn from(tab: Tab) -> Self {
        match tab {
            Tab::Home => Self::Home,
            Tab::Search => Self::Search,
            Tab::Cart => Self::Cart,
            Tab::Profile => Self::Profile,
            Tab::Admin => Self::Admin,
        }
    }
}

impl Screen {
    /// Whether this screen is one of the bottom-bar tabs.
    #[must_use]
    pub const fn is_tab(self) -> bool {
        matches!(
            self,
            Self::Home | Self::Search | Self::Cart | Self::Profile | Self::Admin
        )
    }

    /// Header title. Product details fall back to a generic title when no
    /// product is selected.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Home => "TechShop",
            Self::Search => "Поиск",
            Self::Cart => "Корзина",
            Self::Profile => "Профиль",
            Self::Admin => "Управление",
            Self::ProductDetail => "Товар",
            Self::OrderDetail => "Заказ",
            Self::EditProfile => "Редактировать профиль",
            Self::OrderHistory => "Мои заказы",
            Self::Addresses => "Адреса доставки",
            Self::Favorites => "Избранное",
            Self::Settings => "Настройки",
            Self::Checkout => "Оформление заказа",
            Self::Notifications => "Уведомления",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// The product currently open on the detail screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedProduct {
    pub id: ProductId,
    pub name: String,
}

/// Navigation history plus the entity the detail screens show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigator {
    stack: Vec<Screen>,
    selected_product: Option<SelectedProduct>,
    selected_order: Option<OrderId>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    /// Start on the home screen.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: vec![Screen::Home],
            selected_product: None,
            selected_order: None,
        }
    }

    /// The screen on top of the stack.
    #[must_use]
    pub fn current(&self) -> Screen {
        self.stack.last().copied().unwrap_or(Screen::Home)
    }

    #[must_use]
    pub fn history(&self) -> &[Screen] {
        &self.stack
    }

    pub fn navigate_to(&mut self, screen: Screen) {
        tracing::trace!(%screen, depth = self.stack.len(), "Navigate");
        self.stack.push(screen);
    }

    /// Pop the current screen, landing on home once history runs out.
    pub fn go_back(&mut self) -> Screen {
        self.stack.pop();
        if self.stack.is_empty() {
            self.stack.push(Screen::Home);
        }
        self.current()
    }

    /// Reset history to a single tab.
    pub fn switch_tab(&mut self, tab: Tab) {
        self.stack.clear();
        self.stack.push(tab.into());
    }

    /// Open a product's detail screen.
    pub fn select_product(&mut self, product: &Product) {
        self.selected_product = Some(SelectedProduct {
            id: product.id.clone(),
            name: product.name.clone(),
        });
        self.navigate_to(Screen::ProductDetail);
    }

    /// Open an order's detail screen.
    pub fn select_order(&mut self, order_id: OrderId) {
        self.selected_order = Some(order_id);
        self.navigate_to(Screen::OrderDetail);
    }

    #[must_use]
    pub const fn selected_product(&self) -> Option<&SelectedProduct> {
        self.selected_product.as_ref()
    }

    #[must_use]
    pub const fn selected_order(&self) -> Option<&OrderId> {
        self.selected_order.as_ref()
    }

    /// Title for the header, using the selected product's name on its
    /// detail screen.
    #[must_use]
    pub fn title(&self) -> &str {
        match (self.current(), &self.selected_product) {
            (Screen::ProductDetail, Some(product)) => &product.name,
            (screen, _) => screen.title(),
        }
    }

    #[must_use]
    pub fn shows_bottom_nav(&self) -> bool {
        self.current().is_tab()
    }

    #[must_use]
    pub fn shows_back_button(&self) -> bool {
        !self.current().is_tab()
    }
}
