diesel::table! {
    /// 钱包表
    wallets (id) {
        /// 主键 ID
        id -> Int8,
        /// 小写地址，唯一
        address -> Varchar,
        /// 创建时间
        created_at -> Timestamp,
        /// 最近一次余额刷新时间
        updated_at -> Timestamp,
    }
}

diesel::table! {
    /// 钱包交易缓存表，(hash, chain_id) 唯一
    wallet_transactions (id) {
        /// 主键 ID
        id -> Int8,
        /// 关联钱包，可为空
        wallet_id -> Nullable<Int8>,
        /// 交易哈希
        hash -> Varchar,
        /// 链 ID
        chain_id -> Int8,
        /// 发送方地址
        from_address -> Varchar,
        /// 接收方地址
        to_address -> Varchar,
        /// 原生币金额（十进制字符串）
        amount -> Varchar,
        /// 区块号
        block_number -> Nullable<Int8>,
        /// Gas 使用量
        gas_used -> Nullable<Int8>,
        /// Gas 价格
        gas_price -> Nullable<Int8>,
        /// 区块时间戳
        timestamp -> Int8,
        /// success / failed
        status -> Varchar,
        /// 代币合约地址
        token_address -> Nullable<Varchar>,
        token_from -> Nullable<Varchar>,
        token_to -> Nullable<Varchar>,
        token_name -> Nullable<Varchar>,
        token_symbol -> Nullable<Varchar>,
        token_decimals -> Nullable<Int2>,
        /// 代币原始数量
        token_amount_raw -> Nullable<Varchar>,
        /// 代币格式化数量
        token_amount -> Nullable<Varchar>,
        /// 是否已按收据检查过代币转账
        receipt_checked -> Bool,
        /// 创建时间
        created_at -> Timestamp,
        /// 更新时间
        updated_at -> Timestamp,
    }
}

diesel::joinable!(wallet_transactions -> wallets (wallet_id));
diesel::allow_tables_to_appear_in_same_query!(wallets, wallet_transactions);
