macro_rules! usecase {
    ($n:ident : { $( $i:tt )* } => { $( $o:tt )* }) => {
        pub mod $n {
            #[allow(unused_imports)]
            use crate::entities;

            #[::async_trait::async_trait]
            pub trait Usecase {
                async fn handle(&self, data: Input) -> ::anyhow::Result<Output>;
            }

            #[derive(Debug, Clone)]
            pub struct Input { $( $i )* }

            #[derive(Debug, Clone)]
            pub struct Output { $( $o )* }
        }
    };
}

pub mod content;
pub mod inbox;
pub mod ledger;
pub mod user;
