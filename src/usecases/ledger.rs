use crate::entities::{CartEntry, Cents};
use crate::repositories::Receipt;

#[derive(Debug, Clone)]
pub struct Purchase {
    pub entry: CartEntry,
    /// `None` for free entries.
    pub receipt: Option<Receipt>,
    pub download_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FailedPurchase {
    pub entry: CartEntry,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawMethod {
    Paypal,
    GooglePay,
    Wire,
}

impl WithdrawMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paypal => "paypal",
            Self::GooglePay => "google-pay",
            Self::Wire => "wire",
        }
    }
}

impl ::core::str::FromStr for WithdrawMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "paypal" => Ok(Self::Paypal),
            "google-pay" | "googlepay" | "gpay" => Ok(Self::GooglePay),
            "wire" | "bank" => Ok(Self::Wire),
            o => Err(format!("unknown withdraw method: {}", o)),
        }
    }
}

usecase! {
    checkout : {
        pub buyer: entities::UserId,
        pub pin: String,
    } => {
        pub purchased: Vec<super::Purchase>,
        pub failed: Vec<super::FailedPurchase>,
        pub balance: entities::Cents,
    }
}

usecase! {
    gift : {
        pub actor: entities::UserId,
        pub target: entities::UserId,
        pub amount: entities::Cents,
        pub pin: String,
    } => {
        pub receipt: crate::repositories::Receipt,
    }
}

usecase! {
    withdraw : {
        pub actor: entities::UserId,
        pub method: Option<super::WithdrawMethod>,
        pub account: String,
        pub amount: entities::Cents,
        pub pin: String,
    } => {
        pub receipt: crate::repositories::Receipt,
    }
}

usecase! {
    subscribe : {
        pub actor: entities::UserId,
        pub plan: entities::Plan,
        pub pin: String,
    } => {
        pub user: entities::User,
        pub receipt: crate::repositories::Receipt,
    }
}

pub(crate) fn total(entries: &[CartEntry]) -> Cents {
    entries.iter().map(|e| e.content.pricing.price()).sum()
}
