//! Fixed-layout payload types. All fields big-endian `u32`.

use crate::core_types::{Funds, OrderId, Quantity};

use super::ProtocolError;

macro_rules! fixed_payload {
    ($name:ident { $($field:ident),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name {
            $(pub $field: u32,)+
        }

        impl $name {
            pub const LEN: usize = 4 * fixed_payload!(@count $($field),+);

            pub fn to_bytes(self) -> Vec<u8> {
                let mut buf = Vec::with_capacity(Self::LEN);
                $(buf.extend_from_slice(&self.$field.to_be_bytes());)+
                buf
            }

            pub fn from_bytes(buf: &[u8]) -> Result<$name, ProtocolError> {
                if buf.len() != Self::LEN {
                    return Err(ProtocolError::BadPayloadSize {
                        expected: Self::LEN as u16,
                        actual: buf.len() as u16,
                    });
                }
                let mut offset = 0;
                $(
                    let $field = u32::from_be_bytes(buf[offset..offset + 4].try_into().unwrap());
                    offset += 4;
                )+
                Ok($name { $($field,)+ })
            }
        }
    };
    (@count $($x:ident),+) => {
        <[()]>::len(&[$(fixed_payload!(@unit $x)),+])
    };
    (@unit $x:ident) => { () };
}

fixed_payload!(FundsInfo { amount });
fixed_payload!(EscrowInfo { quantity });
fixed_payload!(OrderInfo { quantity, price });
fixed_payload!(CancelInfo { order });

/// STATUS / ACK payload: 28 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusInfo {
    pub orderid: OrderId,
    pub balance: Funds,
    pub inventory: Quantity,
    pub bid: Funds,
    pub ask: Funds,
    pub last: Funds,
    pub quantity: Quantity,
}

impl StatusInfo {
    pub const LEN: usize = 28;

    pub fn to_bytes(self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::LEN);
        buf.extend_from_slice(&self.orderid.to_be_bytes());
        buf.extend_from_slice(&self.balance.to_be_bytes());
        buf.extend_from_slice(&self.inventory.to_be_bytes());
        buf.extend_from_slice(&self.bid.to_be_bytes());
        buf.extend_from_slice(&self.ask.to_be_bytes());
        buf.extend_from_slice(&self.last.to_be_bytes());
        buf.extend_from_slice(&self.quantity.to_be_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<StatusInfo, ProtocolError> {
        if buf.len() != Self::LEN {
            return Err(ProtocolError::BadPayloadSize {
                expected: Self::LEN as u16,
                actual: buf.len() as u16,
            });
        }
        let word = |i: usize| u32::from_be_bytes(buf[i * 4..i * 4 + 4].try_into().unwrap());
        Ok(StatusInfo {
            orderid: word(0),
            balance: word(1),
            inventory: word(2),
            bid: word(3),
            ask: word(4),
            last: word(5),
            quantity: word(6),
        })
    }
}

/// BOUGHT/SOLD/POSTED/CANCELED/TRADED payload: 16 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyInfo {
    pub buyer: OrderId,
    pub seller: OrderId,
    pub quantity: Quantity,
    pub price: Funds,
}

impl NotifyInfo {
    pub const LEN: usize = 16;

    pub fn to_bytes(self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::LEN);
        buf.extend_from_slice(&self.buyer.to_be_bytes());
        buf.extend_from_slice(&self.seller.to_be_bytes());
        buf.extend_from_slice(&self.quantity.to_be_bytes());
        buf.extend_from_slice(&self.price.to_be_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<NotifyInfo, ProtocolError> {
        if buf.len() != Self::LEN {
            return Err(ProtocolError::BadPayloadSize {
                expected: Self::LEN as u16,
                actual: buf.len() as u16,
            });
        }
        let word = |i: usize| u32::from_be_bytes(buf[i * 4..i * 4 + 4].try_into().unwrap());
        Ok(NotifyInfo {
            buyer: word(0),
            seller: word(1),
            quantity: word(2),
            price: word(3),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_info_round_trips() {
        let info = StatusInfo {
            orderid: 7,
            balance: 100,
            inventory: 5,
            bid: 10,
            ask: 12,
            last: 11,
            quantity: 3,
        };
        let bytes = info.to_bytes();
        assert_eq!(bytes.len(), StatusInfo::LEN);
        assert_eq!(StatusInfo::from_bytes(&bytes).unwrap(), info);
    }

    #[test]
    fn notify_info_round_trips() {
        let info = NotifyInfo {
            buyer: 1,
            seller: 2,
            quantity: 10,
            price: 75,
        };
        let bytes = info.to_bytes();
        assert_eq!(bytes.len(), NotifyInfo::LEN);
        assert_eq!(NotifyInfo::from_bytes(&bytes).unwrap(), info);
    }

    #[test]
    fn order_info_rejects_wrong_length() {
        let err = OrderInfo::from_bytes(&[0u8; 3]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::BadPayloadSize {
                expected: 8,
                actual: 3
            }
        ));
    }
}
