use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use super::{item_err_fmt, ledger_err_fmt, notify, user_err_fmt, verify_pin, Services};
use crate::entities::{CartEntry, NotificationKind, Plan, Pricing, User};
use crate::repositories::{Debit, IdempotencyKey, PlanPurchase, RepositoryError, Transfer};
use crate::usecases::ledger::{checkout, gift, subscribe, total, withdraw, FailedPurchase, Purchase};
use crate::utils::{format_cents, AlsoChain, LetChain};

pub struct LedgerInteractor {
    pub services: Services,
}

impl LedgerInteractor {
    /// moves one cart entry to the buyer. the entry leaves the cart only once
    /// the money has moved; the key depends on the entry alone, so a retried
    /// checkout replays the transfer instead of charging again.
    async fn settle_entry(&self, buyer: &User, entry: &CartEntry) -> Result<Purchase> {
        let reference = &entry.content.reference;
        let price = entry.content.pricing.price();

        let receipt = match entry.content.pricing {
            Pricing::Free => None,
            Pricing::Paid(_) => self
                .services
                .ledger
                .transfer(Transfer {
                    key: IdempotencyKey(format!("checkout:{}:{}", buyer.id, entry.id)),
                    from: buyer.id.clone(),
                    to: reference.owner.clone(),
                    amount: price,
                })
                .await
                .map_err(ledger_err_fmt)?
                .let_(Some),
        };

        let download_url = match &entry.content.media {
            Some(path) => match self.services.blobs.download_url(path).await {
                Ok(u) => Some(u),
                Err(e) => {
                    tracing::warn!("no download for {}: {}", reference.id, e);
                    None
                },
            },
            None => None,
        };

        if receipt.as_ref().map(|r| !r.replayed).unwrap_or(true) {
            let name = match buyer.username.is_empty() {
                true => "A user",
                false => buyer.username.as_str(),
            };
            notify(
                &self.services,
                &reference.owner,
                &buyer.id,
                name,
                NotificationKind::Purchase {
                    content: reference.clone(),
                    amount: price,
                },
                format!(
                    "{} just bought your {} '{}' @ {}",
                    name,
                    reference.kind,
                    entry.content.title,
                    format_cents(price)
                ),
            )
            .await;
            self.services
                .alerts
                .send(format!(
                    "Purchase: {} bought the {} '{}' from {} @ {}",
                    name,
                    reference.kind,
                    entry.content.title,
                    entry.content.owner_name,
                    format_cents(price)
                ))
                .await;
        }

        // paid already; a stale entry replays on the next checkout
        if let Err(e) = self.services.carts.remove(&buyer.id, entry.id).await {
            tracing::warn!("bought {} but it stays in the cart: {}", entry.id, e);
        }

        Ok(Purchase {
            entry: entry.clone(),
            receipt,
            download_url,
        })
    }
}

#[async_trait]
impl checkout::Usecase for LedgerInteractor {
    #[tracing::instrument(skip(self, data), fields(buyer = %data.buyer))]
    async fn handle(&self, data: checkout::Input) -> Result<checkout::Output> {
        let checkout::Input { buyer, pin } = data;

        let buyer = verify_pin(&self.services, &buyer, &pin).await?;

        let entries = self
            .services
            .carts
            .list(&buyer.id)
            .await
            .map_err(item_err_fmt)?;
        if entries.is_empty() {
            bail!("your cart is empty.");
        }

        let spend = total(&entries);
        if spend > buyer.balance {
            bail!(
                "You don't have enough balance, you plan to spend {} and your balance is {}",
                format_cents(spend),
                format_cents(buyer.balance)
            );
        }

        let mut purchased = vec![];
        let mut failed = vec![];
        for entry in entries {
            match self.settle_entry(&buyer, &entry).await {
                Ok(p) => purchased.push(p),
                Err(e) => {
                    tracing::warn!("purchase of {} failed: {}", entry.id, e);
                    failed.push(FailedPurchase {
                        entry,
                        reason: e.to_string(),
                    });
                },
            }
        }

        let balance = self
            .services
            .ledger
            .balance(&buyer.id)
            .await
            .map_err(user_err_fmt)?;

        checkout::Output {
            purchased,
            failed,
            balance,
        }
        .also_(|o| {
            tracing::info!(
                "checkout by {}: {} purchased, {} failed",
                buyer.id,
                o.purchased.len(),
                o.failed.len()
            )
        })
        .let_(Ok)
    }
}

#[async_trait]
impl gift::Usecase for LedgerInteractor {
    #[tracing::instrument(skip(self, data), fields(actor = %data.actor, target = %data.target))]
    async fn handle(&self, data: gift::Input) -> Result<gift::Output> {
        let gift::Input {
            actor,
            target,
            amount,
            pin,
        } = data;

        let sender = verify_pin(&self.services, &actor, &pin).await?;

        if actor == target {
            bail!("You cannot gift yourself");
        }
        let min = self.services.ledger_config.min_gift_cents;
        if amount < min {
            bail!("minimum gift is {}", format_cents(min));
        }
        if amount > sender.balance {
            bail!("Insufficient balance.");
        }

        let receipt = self
            .services
            .ledger
            .transfer(Transfer {
                key: IdempotencyKey::new("gift"),
                from: actor.clone(),
                to: target.clone(),
                amount,
            })
            .await
            .map_err(ledger_err_fmt)?;

        let name = sender.display_name().to_string();
        notify(
            &self.services,
            &target,
            &actor,
            &name,
            NotificationKind::Gift { amount },
            format!("{} just Gifted you {}", name, format_cents(amount)),
        )
        .await;

        Ok(gift::Output { receipt })
    }
}

#[async_trait]
impl withdraw::Usecase for LedgerInteractor {
    #[tracing::instrument(skip(self, data), fields(actor = %data.actor))]
    async fn handle(&self, data: withdraw::Input) -> Result<withdraw::Output> {
        let withdraw::Input {
            actor,
            method,
            account,
            amount,
            pin,
        } = data;

        let user = verify_pin(&self.services, &actor, &pin).await?;

        let method = match method {
            Some(m) => m,
            None => bail!("Please select a withdraw method"),
        };
        if account.trim().is_empty() {
            bail!("Please enter your account number");
        }
        if amount <= 0 {
            bail!("Please enter an amount");
        }
        if amount > user.balance {
            bail!("Insufficient balance.");
        }
        if amount < self.services.ledger_config.min_withdrawal_cents {
            bail!(
                "min withdrawal is {}",
                format_cents(self.services.ledger_config.min_withdrawal_cents)
                    .trim_end_matches(".00")
            );
        }
        if let Some(max) = user.plan.max_withdrawal() {
            if amount > max {
                bail!(
                    "your {} plan allows withdrawals up to {}",
                    user.plan,
                    format_cents(max)
                );
            }
        }

        let receipt = self
            .services
            .ledger
            .debit(Debit {
                key: IdempotencyKey::new("withdraw"),
                from: actor.clone(),
                amount,
            })
            .await
            .map_err(ledger_err_fmt)?;

        self.services
            .alerts
            .send(format!(
                "Withdraw Request:\n\nusername: {}, User: {} {}, Amount: {}, Withdraw Method: {}, \
                 Account Number: {}, Balance was {} and is now {}",
                user.username,
                user.first_name,
                user.last_name,
                format_cents(amount),
                method.as_str(),
                account.trim(),
                format_cents(receipt.from_before),
                format_cents(receipt.from_after)
            ))
            .await;

        Ok(withdraw::Output { receipt })
    }
}

#[async_trait]
impl subscribe::Usecase for LedgerInteractor {
    #[tracing::instrument(skip(self, data), fields(actor = %data.actor, plan = %data.plan))]
    async fn handle(&self, data: subscribe::Input) -> Result<subscribe::Output> {
        let subscribe::Input { actor, plan, pin } = data;

        let user = verify_pin(&self.services, &actor, &pin).await?;

        if user.plan == plan {
            bail!("You are already on the {} plan", plan);
        }
        let price = plan.price();
        if price > user.balance {
            bail!("Not Enough Money");
        }

        let remaining_secs = match plan {
            Plan::Free => 0,
            _ => self.services.ledger_config.plan_secs(),
        };
        let receipt = self
            .services
            .ledger
            .purchase_plan(PlanPurchase {
                key: IdempotencyKey::new("plan"),
                user: actor.clone(),
                plan,
                price,
                remaining_secs,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::InsufficientFunds { .. } => anyhow!("Not Enough Money"),
                e => ledger_err_fmt(e),
            })?;

        let user = self
            .services
            .users
            .find(&actor)
            .await
            .map_err(user_err_fmt)?;

        Ok(subscribe::Output { user, receipt })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use futures::future::join_all;
    use uuid::Uuid;

    use super::*;
    use crate::entities::{ContentKind, UserId};
    use crate::interactors::tests::Fixture;
    use crate::repositories::mock::tests::content;
    use crate::repositories::mock::InMemoryInbox;
    use crate::repositories::{InboxRepository, Result as RepoResult, UserRepository};
    use crate::usecases::ledger::WithdrawMethod;

    fn interactor(fx: &Fixture) -> LedgerInteractor {
        LedgerInteractor {
            services: fx.services.clone(),
        }
    }

    /// puts a paid item owned by `seller` into `buyer`'s cart.
    async fn stock(fx: &Fixture, buyer: &UserId, seller: &str, title: &str, price: i64) {
        let mut c = content(seller, ContentKind::Ebook, title);
        c.pricing = Pricing::Paid(price);
        fx.content(c.clone()).await;
        fx.services
            .carts
            .push(buyer, CartEntry {
                id: Uuid::new_v4(),
                content: c.snapshot(),
                added: Utc::now(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn checkout_moves_money_and_empties_cart() {
        let fx = Fixture::new();
        let i = interactor(&fx);
        let buyer = fx.user("buyer", 2_000).await;
        let seller = fx.user("seller", 0).await;
        stock(&fx, &buyer, "seller", "Guide", 1_500).await;

        let out = checkout::Usecase::handle(&i, checkout::Input {
            buyer: buyer.clone(),
            pin: "1234".to_string(),
        })
        .await
        .unwrap();

        assert_eq!(out.purchased.len(), 1);
        assert!(out.failed.is_empty());
        assert_eq!(out.balance, 500);
        assert_eq!(fx.balance(&buyer).await, 500);
        assert_eq!(fx.balance(&seller).await, 1_500);
        assert!(fx.services.carts.list(&buyer).await.unwrap().is_empty());
        assert_eq!(
            fx.notifications.list(&seller).await.unwrap()[0].note,
            "@buyer just bought your ebook 'Guide' @ $15.00"
        );
    }

    #[tokio::test]
    async fn wrong_pin_mutates_nothing() {
        let fx = Fixture::new();
        let i = interactor(&fx);
        let buyer = fx.user("buyer", 2_000).await;
        let seller = fx.user("seller", 0).await;
        stock(&fx, &buyer, "seller", "Guide", 1_500).await;

        let err = checkout::Usecase::handle(&i, checkout::Input {
            buyer: buyer.clone(),
            pin: "9999".to_string(),
        })
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "Incorrect Pin, try again");
        assert_eq!(fx.balance(&buyer).await, 2_000);
        assert_eq!(fx.balance(&seller).await, 0);
        assert_eq!(fx.services.carts.list(&buyer).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_seller_leaves_buyer_whole() {
        let fx = Fixture::new();
        let i = interactor(&fx);
        let buyer = fx.user("buyer", 2_000).await;
        stock(&fx, &buyer, "vanished", "Lost", 1_500).await;

        let out = checkout::Usecase::handle(&i, checkout::Input {
            buyer: buyer.clone(),
            pin: "1234".to_string(),
        })
        .await
        .unwrap();

        assert!(out.purchased.is_empty());
        assert_eq!(out.failed.len(), 1);
        assert_eq!(out.balance, 2_000);
        assert_eq!(fx.services.carts.list(&buyer).await.unwrap().len(), 1);
    }

    /// cart whose removals always fail.
    struct StuckCart(InMemoryInbox<CartEntry>);

    #[async_trait]
    impl InboxRepository<CartEntry> for StuckCart {
        async fn push(&self, owner: &UserId, item: CartEntry) -> RepoResult<()> {
            self.0.push(owner, item).await
        }

        async fn list(&self, owner: &UserId) -> RepoResult<Vec<CartEntry>> {
            self.0.list(owner).await
        }

        async fn remove(&self, _: &UserId, _: Uuid) -> RepoResult<CartEntry> {
            Err(RepositoryError::Internal(anyhow!("store down")))
        }

        async fn replace(&self, owner: &UserId, items: Vec<CartEntry>) -> RepoResult<()> {
            self.0.replace(owner, items).await
        }
    }

    #[tokio::test]
    async fn stuck_cart_entry_is_not_charged_twice() {
        let mut fx = Fixture::new();
        fx.services.carts = Arc::new(StuckCart(InMemoryInbox::new()));
        let i = interactor(&fx);
        let buyer = fx.user("buyer", 4_000).await;
        let seller = fx.user("seller", 0).await;
        stock(&fx, &buyer, "seller", "Guide", 1_500).await;

        for round in 0..2 {
            let out = checkout::Usecase::handle(&i, checkout::Input {
                buyer: buyer.clone(),
                pin: "1234".to_string(),
            })
            .await
            .unwrap();

            assert_eq!(out.purchased.len(), 1, "round {}", round);
            assert!(out.failed.is_empty(), "round {}", round);
            assert_eq!(out.balance, 2_500, "round {}", round);
            assert_eq!(
                out.purchased[0].receipt.as_ref().unwrap().replayed,
                round == 1
            );
        }

        assert_eq!(fx.balance(&seller).await, 1_500);
        assert_eq!(fx.notifications.list(&seller).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_gifts_conserve_total() {
        let fx = Fixture::new();
        let i = Arc::new(interactor(&fx));
        let mut users = vec![];
        for name in ["a", "b", "c", "d"] {
            users.push(fx.user(name, 1_000).await);
        }

        let tasks = (0..40).map(|n| {
            let i = i.clone();
            let actor = users[n % 4].clone();
            let target = users[(n + 1) % 4].clone();

            tokio::spawn(async move {
                gift::Usecase::handle(&*i, gift::Input {
                    actor,
                    target,
                    amount: 10 + n as i64,
                    pin: "1234".to_string(),
                })
                .await
            })
        });

        for res in join_all(tasks).await {
            res.unwrap().unwrap();
        }

        let mut total = 0;
        for u in &users {
            total += fx.balance(u).await;
        }
        assert_eq!(total, 4_000);
    }

    #[tokio::test]
    async fn checkout_over_balance_is_refused() {
        let fx = Fixture::new();
        let i = interactor(&fx);
        let buyer = fx.user("buyer", 1_000).await;
        fx.user("seller", 0).await;
        stock(&fx, &buyer, "seller", "Guide", 1_500).await;

        let err = checkout::Usecase::handle(&i, checkout::Input {
            buyer: buyer.clone(),
            pin: "1234".to_string(),
        })
        .await
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "You don't have enough balance, you plan to spend $15.00 and your balance is $10.00"
        );
    }

    #[tokio::test]
    async fn gift_conserves_balance() {
        let fx = Fixture::new();
        let i = interactor(&fx);
        let a = fx.user("a", 1_000).await;
        let b = fx.user("b", 0).await;

        let receipt = gift::Usecase::handle(&i, gift::Input {
            actor: a.clone(),
            target: b.clone(),
            amount: 250,
            pin: "1234".to_string(),
        })
        .await
        .unwrap()
        .receipt;

        assert_eq!(receipt.from_after, 750);
        assert_eq!(fx.balance(&a).await + fx.balance(&b).await, 1_000);
        assert_eq!(
            fx.notifications.list(&b).await.unwrap()[0].note,
            "@a just Gifted you $2.50"
        );

        for (target, amount) in [(b.clone(), 5), (a.clone(), 100), (b.clone(), 10_000)] {
            assert!(gift::Usecase::handle(&i, gift::Input {
                actor: a.clone(),
                target,
                amount,
                pin: "1234".to_string(),
            })
            .await
            .is_err());
        }
        assert_eq!(fx.balance(&a).await, 750);
    }

    #[tokio::test]
    async fn withdraw_limits() {
        let fx = Fixture::new();
        let i = interactor(&fx);
        let a = fx.user("a", 10_000).await;

        let attempt = |amount| {
            withdraw::Usecase::handle(&i, withdraw::Input {
                actor: a.clone(),
                method: Some(WithdrawMethod::Paypal),
                account: "acct-1".to_string(),
                amount,
                pin: "1234".to_string(),
            })
        };

        assert_eq!(
            attempt(500).await.unwrap_err().to_string(),
            "min withdrawal is $10"
        );
        assert_eq!(
            attempt(20_000).await.unwrap_err().to_string(),
            "Insufficient balance."
        );
        assert!(attempt(6_000).await.is_err());

        let receipt = attempt(2_000).await.unwrap().receipt;
        assert_eq!(receipt.from_after, 8_000);
        assert_eq!(fx.balance(&a).await, 8_000);

        let alerts = fx.alerts.messages().await;
        assert!(alerts[0].starts_with("Withdraw Request:\n\nusername: @a"));
        assert!(alerts[0].ends_with("Balance was $100.00 and is now $80.00"));
    }

    #[tokio::test]
    async fn subscribe_charges_and_sets_time() {
        let fx = Fixture::new();
        let i = interactor(&fx);
        let a = fx.user("a", 600).await;

        let out = subscribe::Usecase::handle(&i, subscribe::Input {
            actor: a.clone(),
            plan: Plan::Pro,
            pin: "1234".to_string(),
        })
        .await
        .unwrap();
        assert_eq!(out.user.plan, Plan::Pro);
        assert_eq!(out.user.balance, 101);
        assert_eq!(out.user.remaining_secs, 30 * 24 * 60 * 60);

        let again = subscribe::Usecase::handle(&i, subscribe::Input {
            actor: a.clone(),
            plan: Plan::Pro,
            pin: "1234".to_string(),
        })
        .await;
        assert!(again.is_err());

        let poor = subscribe::Usecase::handle(&i, subscribe::Input {
            actor: a.clone(),
            plan: Plan::ProPlus,
            pin: "1234".to_string(),
        })
        .await;
        assert_eq!(poor.unwrap_err().to_string(), "Not Enough Money");
        assert_eq!(fx.users.find(&a).await.unwrap().plan, Plan::Pro);
    }
}
